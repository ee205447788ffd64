//! HTTP server setup.
//!
//! # Responsibilities
//! - Wrap a built [`App`] in an Axum fallback service
//! - Collect request bodies up to the configured limit
//! - Run the synchronous chain on Tokio's blocking pool
//! - Wire up tower-http layers (tracing, request timeout)
//! - Serve until shutdown, then drain within the grace period

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Notify};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::http::app::App;
use crate::lifecycle::shutdown;

/// State injected into the fallback handler.
#[derive(Clone)]
struct ServerState {
    app: Arc<App>,
    max_body_bytes: usize,
}

/// HTTP front end for an [`App`].
pub struct HttpServer {
    router: Router,
    app: Arc<App>,
    shutdown_grace: Duration,
}

impl HttpServer {
    pub fn new(app: App, config: &ServerConfig) -> Self {
        Self::from_shared(Arc::new(app), config)
    }

    /// Serve an app that is also held elsewhere.
    pub fn from_shared(app: Arc<App>, config: &ServerConfig) -> Self {
        let state = ServerState {
            app: Arc::clone(&app),
            max_body_bytes: config.listener.max_body_bytes,
        };
        let router = Self::build_router(config, state);
        Self {
            router,
            app,
            shutdown_grace: Duration::from_secs(config.timeouts.shutdown_grace_secs),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: ServerState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
    }

    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    /// The Axum router, for embedding or for driving with `oneshot` in tests.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Accept connections on `listener` until `shutdown` fires, then let
    /// in-flight requests finish within the grace period.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, routes = self.app.routes().len(), "HTTP server starting");

        let signalled = Arc::new(Notify::new());
        let notify = Arc::clone(&signalled);
        let signal = async move {
            shutdown::wait(shutdown).await;
            tracing::info!("Draining in-flight requests");
            notify.notify_one();
        };

        let service = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let serve = axum::serve(listener, service)
            .with_graceful_shutdown(signal)
            .into_future();
        tokio::pin!(serve);

        let grace = self.shutdown_grace;
        tokio::select! {
            result = &mut serve => result?,
            _ = async {
                signalled.notified().await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(grace_secs = grace.as_secs(), "Grace period elapsed, dropping open connections");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Fallback handler: every request goes through the route tree.
async fn dispatch(State(state): State<ServerState>, request: Request<Body>) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                path = %parts.uri.path(),
                limit = state.max_body_bytes,
                error = %e,
                "Rejecting request body"
            );
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };
    let request = Request::from_parts(parts, bytes);

    let app = Arc::clone(&state.app);
    match tokio::task::spawn_blocking(move || app.dispatch(request, remote_addr)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Dispatch task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
