//! HTTP control surface for the managed VM.
//!
//! | Method | Path         | Success body                              |
//! |--------|--------------|-------------------------------------------|
//! | POST   | `/vm/start`  | `{"status":"RUNNING"}`                    |
//! | POST   | `/vm/stop`   | `{"status":"STOPPED"}`                    |
//! | GET    | `/vm/status` | `{"status":"…","startedAt":"…" \| null}`  |
//! | GET    | `/health`    | `{"status":"ok","version":"…"}`           |

mod handlers;
mod response;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::backend::ComputeBackend;

pub use response::{
    ActionResponse, HealthResponse, START_FAILED, STATUS_FAILED, STOP_FAILED, StatusReport,
};

/// Read-only state shared by every handler.
#[derive(Debug)]
pub struct AppState<B> {
    backend: Arc<B>,
}

impl<B> AppState<B> {
    /// Wraps the backend handed to each request.
    #[must_use]
    pub const fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// The backend behind the handlers.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

/// Builds the application router around `backend`.
pub fn router<B>(backend: Arc<B>) -> Router
where
    B: ComputeBackend + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(handlers::health))
        .route("/vm/start", post(handlers::start_vm::<B>))
        .route("/vm/stop", post(handlers::stop_vm::<B>))
        .route("/vm/status", get(handlers::vm_status::<B>))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(backend))
}
