//! `ParleyServer`: Axum HTTP server for one process role.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::response::Json;
use axum::routing::{get, post};
use parley_pipeline::LocalJobRunner;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{Role, ServerConfig};
use crate::handlers::{JobHandler, runsync, upload};
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Role of this process.
    pub role: Role,
    /// Serverless job handler for the role.
    pub handler: Arc<dyn JobHandler>,
    /// When the server started.
    pub start_time: Instant,
}

/// The parley HTTP server.
pub struct ParleyServer {
    config: ServerConfig,
    handler: Arc<dyn JobHandler>,
    uploads: Option<Arc<LocalJobRunner>>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl ParleyServer {
    /// Create a server exposing `handler` on `/runsync`.
    pub fn new(config: ServerConfig, handler: Arc<dyn JobHandler>) -> Self {
        Self {
            config,
            handler,
            uploads: None,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Also expose the OpenAI-compatible upload routes backed by `runner`.
    #[must_use]
    pub fn with_uploads(mut self, runner: Arc<LocalJobRunner>) -> Self {
        self.uploads = Some(runner);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            role: self.config.role,
            handler: Arc::clone(&self.handler),
            start_time: self.start_time,
        };

        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/runsync", post(runsync::runsync))
            .with_state(state);

        if let Some(runner) = &self.uploads {
            router = router.merge(
                Router::new()
                    .route("/v1/audio/transcriptions", post(upload::transcribe_upload))
                    .route("/v1/models", get(upload::list_models))
                    .with_state(Arc::clone(runner)),
            );
        }

        let limit = self.config.max_upload_bytes;
        router
            .layer(DefaultBodyLimit::max(limit))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind and serve until the shutdown token is cancelled.
    ///
    /// In-flight requests finish before the returned task completes.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;

        let router = self.router();
        let token = self.shutdown.token();
        let role = self.config.role;
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                warn!(error = %e, "server exited with error");
            }
            info!(%role, "server stopped");
        });

        Ok((local_addr, handle))
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.role,
        state.handler.status(),
    ))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use parley_core::JobError;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::handlers::ModelStatus;

    struct Echo;

    #[async_trait]
    impl JobHandler for Echo {
        async fn handle(&self, input: Value) -> Result<Value, JobError> {
            if input.get("fail").is_some() {
                return Err(JobError::unavailable("Model not loaded yet"));
            }
            Ok(json!({"echo": input}))
        }

        fn status(&self) -> ModelStatus {
            ModelStatus {
                model_loaded: true,
                model_id: None,
                diarization_available: false,
                device: "cpu".into(),
            }
        }
    }

    fn make_server() -> ParleyServer {
        let config = ServerConfig {
            role: Role::Orchestrator,
            ..ServerConfig::default()
        };
        ParleyServer::new(config, Arc::new(Echo))
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 100_000)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_role() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(make_server().router(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["role"], "orchestrator");
        assert_eq!(body["modelLoaded"], true);
    }

    #[tokio::test]
    async fn runsync_wraps_output() {
        let (status, body) = send(
            make_server().router(),
            post_json("/runsync", &json!({"input": {"audio": "x"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "COMPLETED");
        assert_eq!(body["output"]["echo"]["audio"], "x");
    }

    #[tokio::test]
    async fn runsync_missing_input_is_400() {
        let (status, body) =
            send(make_server().router(), post_json("/runsync", &json!({"audio": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "FAILED");
        assert_eq!(body["error"], "Missing 'input' in request body");
    }

    #[tokio::test]
    async fn runsync_invalid_json_is_400() {
        let req = Request::builder()
            .method("POST")
            .uri("/runsync")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(make_server().router(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn runsync_unavailable_is_retryable_503() {
        let (status, body) = send(
            make_server().router(),
            post_json("/runsync", &json!({"input": {"fail": true}})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["retryable"], true);
    }

    #[tokio::test]
    async fn upload_routes_absent_without_runner() {
        let req = Request::builder()
            .uri("/v1/models")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(make_server().router(), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_serves_until_shutdown() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            ..ServerConfig::default()
        };
        let server = ParleyServer::new(config, Arc::new(Echo));
        let (addr, handle) = server.listen().await.unwrap();

        let body: Value = reqwest::get(format!("http://{addr}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");

        server.shutdown().shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
