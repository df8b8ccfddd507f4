//! # parley
//!
//! parley server binary. Loads settings, wires the model collaborators for
//! the selected role, and serves HTTP until SIGINT/SIGTERM.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use parley_audio::{SymphoniaNormalizer, WavSlicer};
use parley_core::logging::{init_subscriber, init_subscriber_json};
use parley_core::{Accelerator, Diarizer, SpeechRecognizer};
use parley_pipeline::{DiarizationJobRunner, JobConfig, LocalJobRunner, ModelServices};
use parley_remote::{
    Orchestrator, OrchestratorConfig, SidecarAccelerator, SidecarDiarizer, SidecarRecognizer,
};
use parley_server::{
    DiarizationHandler, OrchestratorHandler, ParleyServer, Role, ServerConfig,
    TranscriptionHandler,
};
use parley_settings::{ParleySettings, load_settings, load_settings_from_path};
use tracing::info;

/// parley transcription server.
#[derive(Parser, Debug)]
#[command(name = "parley", about = "Audio transcription with speaker diarization", version)]
struct Cli {
    /// Settings file (default `~/.parley/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings, 0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Job surface: transcription, diarization, or orchestrator.
    #[arg(long, default_value = "transcription")]
    role: Role,

    /// Emit one JSON object per log line.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn settings(&self) -> Result<ParleySettings> {
        let mut settings = match &self.config {
            Some(path) => load_settings_from_path(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => load_settings().context("Failed to load settings")?,
        };
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if self.log_json {
            settings.logging.json = true;
        }
        Ok(settings)
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")
}

fn sidecar_diarizer(settings: &ParleySettings, http: &reqwest::Client) -> Option<SidecarDiarizer> {
    let diarization = &settings.diarization;
    if !diarization.is_available() {
        info!("no diarization credential configured, speaker diarization disabled");
        return None;
    }
    let token = diarization.access_token.clone().unwrap_or_default();
    Some(SidecarDiarizer::new(
        http.clone(),
        &diarization.sidecar_url,
        token,
        Duration::from_secs(diarization.request_timeout_secs),
    ))
}

fn build_transcription(
    settings: &ParleySettings,
    http: &reqwest::Client,
) -> (Arc<ModelServices>, Arc<LocalJobRunner>) {
    let t = &settings.transcription;
    let accelerator: Arc<dyn Accelerator> = Arc::new(SidecarAccelerator::new(
        http.clone(),
        &t.sidecar_url,
        t.device.clone(),
    ));
    let diarizer = sidecar_diarizer(settings, http).map(|d| Arc::new(d) as Arc<dyn Diarizer>);
    let services = Arc::new(ModelServices::new(t.model_id.clone(), accelerator, diarizer));

    #[allow(clippy::cast_precision_loss)]
    let chunk_duration = t.chunk_duration_secs as f64;
    let runner = Arc::new(LocalJobRunner::new(
        Arc::clone(&services),
        Arc::new(SymphoniaNormalizer),
        Arc::new(WavSlicer),
        http.clone(),
        JobConfig {
            temp_dir: t.temp_dir_path(),
            chunk_duration,
            download_timeout: Duration::from_secs(t.download_timeout_secs),
            model_name: t.model_name.clone(),
        },
    ));
    (services, runner)
}

fn build_diarization(settings: &ParleySettings, http: &reqwest::Client) -> Result<DiarizationHandler> {
    let Some(diarizer) = sidecar_diarizer(settings, http) else {
        bail!("diarization role requires HUGGINGFACE_ACCESS_TOKEN and diarization enabled");
    };
    let t = &settings.transcription;
    let runner = DiarizationJobRunner::new(
        Arc::new(diarizer),
        Arc::new(SymphoniaNormalizer),
        http.clone(),
        t.temp_dir_path(),
        Duration::from_secs(t.download_timeout_secs),
    );
    Ok(DiarizationHandler::new(runner, t.device.clone()))
}

fn build_orchestrator(settings: &ParleySettings, http: &reqwest::Client) -> Result<OrchestratorHandler> {
    let config = OrchestratorConfig::from_settings(&settings.orchestrator)
        .context("Invalid orchestrator configuration")?;
    info!(
        diarization = %config.diarization_url,
        transcription = %config.transcription_url,
        "orchestrator endpoints configured"
    );
    Ok(OrchestratorHandler::new(Orchestrator::new(http, &config)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;

    if settings.logging.json {
        init_subscriber_json(&settings.logging.level);
    } else {
        init_subscriber(&settings.logging.level);
    }
    info!(role = %cli.role, version = env!("CARGO_PKG_VERSION"), "starting parley");

    let temp_dir = settings.transcription.temp_dir_path();
    std::fs::create_dir_all(&temp_dir)
        .with_context(|| format!("Failed to create directory: {}", temp_dir.display()))?;

    let http = http_client()?;
    let config = ServerConfig::from_settings(&settings.server, cli.role);

    let mut services = None;
    let server = match cli.role {
        Role::Transcription => {
            let (svc, runner) = build_transcription(&settings, &http);
            services = Some(svc);
            let handler = Arc::new(TranscriptionHandler::new(Arc::clone(&runner)));
            ParleyServer::new(config, handler).with_uploads(runner)
        }
        Role::Diarization => ParleyServer::new(config, Arc::new(build_diarization(&settings, &http)?)),
        Role::Orchestrator => {
            ParleyServer::new(config, Arc::new(build_orchestrator(&settings, &http)?))
        }
    };

    let shutdown = Arc::clone(server.shutdown());
    let mut tasks = vec![shutdown.listen_for_signals()];

    if let Some(svc) = &services {
        let t = &settings.transcription;
        let url = t.sidecar_url.clone();
        let model_id = t.model_id.clone();
        let timeout = Duration::from_secs(t.request_timeout_secs);
        let loader_http = http.clone();
        tasks.push(svc.spawn_loader(
            Duration::from_secs(t.load_retry_secs),
            shutdown.token(),
            move || {
                let http = loader_http.clone();
                let url = url.clone();
                let model_id = model_id.clone();
                async move {
                    SidecarRecognizer::connect(http, &url, model_id, timeout)
                        .await
                        .map(|r| Arc::new(r) as Arc<dyn SpeechRecognizer>)
                }
            },
        ));
    }

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    info!(role = %cli.role, "parley listening on http://{addr}");

    let _ = handle.await;
    info!("Shutting down...");
    shutdown.graceful_shutdown(tasks, None).await;

    if let Some(svc) = services {
        svc.teardown().await;
    }
    info!("Shutdown complete");
    Ok(())
}
