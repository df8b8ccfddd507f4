//! Long-lived model handles shared by every job.
//!
//! Built once at startup. The recognizer slot may be filled later by a
//! background loader so the process can answer health checks while the model
//! warms up; jobs get [`JobError::Unavailable`] until then.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use parley_core::{Accelerator, CollaboratorError, Diarizer, JobError, SpeechRecognizer};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Model handles for the transcription role.
pub struct ModelServices {
    model_id: String,
    recognizer: RwLock<Option<Arc<dyn SpeechRecognizer>>>,
    diarizer: Option<Arc<dyn Diarizer>>,
    accelerator: Arc<dyn Accelerator>,
}

impl ModelServices {
    /// Create the handle set with an empty recognizer slot.
    pub fn new(
        model_id: impl Into<String>,
        accelerator: Arc<dyn Accelerator>,
        diarizer: Option<Arc<dyn Diarizer>>,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            recognizer: RwLock::new(None),
            diarizer,
            accelerator,
        }
    }

    /// Builder-style variant of [`ModelServices::install_recognizer`].
    #[must_use]
    pub fn with_recognizer(self, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        self.install_recognizer(recognizer);
        self
    }

    /// Put a loaded recognizer in the slot.
    pub fn install_recognizer(&self, recognizer: Arc<dyn SpeechRecognizer>) {
        *self.recognizer.write() = Some(recognizer);
    }

    /// The loaded recognizer, or `Unavailable` when it is still loading.
    pub fn recognizer(&self) -> Result<Arc<dyn SpeechRecognizer>, JobError> {
        self.recognizer
            .read()
            .as_ref()
            .filter(|r| r.is_loaded())
            .cloned()
            .ok_or_else(|| JobError::unavailable("Model not loaded yet"))
    }

    /// Whether a recognizer is installed and ready.
    pub fn is_loaded(&self) -> bool {
        self.recognizer().is_ok()
    }

    /// Configured model identifier.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// The diarizer, when diarization is configured.
    pub fn diarizer(&self) -> Option<Arc<dyn Diarizer>> {
        self.diarizer.clone()
    }

    /// Whether diarization is configured.
    pub fn diarization_available(&self) -> bool {
        self.diarizer.is_some()
    }

    /// The shared accelerator.
    pub fn accelerator(&self) -> Arc<dyn Accelerator> {
        Arc::clone(&self.accelerator)
    }

    /// Keep calling `connect` until it yields a recognizer or `cancel` fires.
    pub fn spawn_loader<F, Fut>(
        self: &Arc<Self>,
        retry_every: Duration,
        cancel: CancellationToken,
        connect: F,
    ) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Arc<dyn SpeechRecognizer>, CollaboratorError>> + Send + 'static,
    {
        let services = Arc::clone(self);
        tokio::spawn(async move {
            let mut attempt = 1u32;
            loop {
                match connect().await {
                    Ok(recognizer) => {
                        info!(model = services.model_id(), attempt, "speech model loaded");
                        services.install_recognizer(recognizer);
                        return;
                    }
                    Err(e) => {
                        warn!(attempt, error = %e, "speech model not ready, retrying");
                    }
                }
                attempt += 1;
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(retry_every) => {}
                }
            }
        })
    }

    /// Release every model deterministically.
    pub async fn teardown(&self) {
        if let Some(diarizer) = &self.diarizer {
            if let Err(e) = diarizer.release().await {
                warn!(error = %e, "failed to release diarizer during teardown");
            }
        }
        let _ = self.recognizer.write().take();
        if let Err(e) = self.accelerator.empty_cache().await {
            warn!(error = %e, "failed to clear accelerator cache during teardown");
        }
        info!("model services torn down");
    }
}
