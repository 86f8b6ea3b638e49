//! Request handlers for the VM control endpoints.
//!
//! Each handler performs exactly one remote call. Failures are logged and
//! collapsed into a 500 with a generic message; on start/stop failure the
//! reported status is the state the VM was presumed to be in beforehand.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::backend::ComputeBackend;
use crate::status::MachineStatus;

use super::AppState;
use super::response::{
    ActionResponse, HealthResponse, START_FAILED, STATUS_FAILED, STOP_FAILED, StatusReport,
};

pub(super) async fn start_vm<B>(State(state): State<AppState<B>>) -> Response
where
    B: ComputeBackend + Send + Sync + 'static,
{
    match state.backend().start().await {
        Ok(()) => {
            tracing::info!("VM started");
            (StatusCode::OK, Json(ActionResponse::ok(MachineStatus::Running))).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "error starting VM");
            failure(MachineStatus::Stopped, START_FAILED)
        }
    }
}

pub(super) async fn stop_vm<B>(State(state): State<AppState<B>>) -> Response
where
    B: ComputeBackend + Send + Sync + 'static,
{
    match state.backend().deallocate().await {
        Ok(()) => {
            tracing::info!("VM deallocated");
            (StatusCode::OK, Json(ActionResponse::ok(MachineStatus::Stopped))).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "error stopping VM");
            failure(MachineStatus::Running, STOP_FAILED)
        }
    }
}

pub(super) async fn vm_status<B>(State(state): State<AppState<B>>) -> Response
where
    B: ComputeBackend + Send + Sync + 'static,
{
    match state.backend().instance_view().await {
        Ok(view) => {
            let status = view.machine_status();
            let started_at = if status == MachineStatus::Running {
                view.first_timestamp().map(str::to_owned)
            } else {
                None
            };
            tracing::debug!(%status, power_state = ?view.power_state(), "fetched VM status");
            (StatusCode::OK, Json(StatusReport { status, started_at })).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "error fetching VM status");
            failure(MachineStatus::Unknown, STATUS_FAILED)
        }
    }
}

#[expect(clippy::unused_async, reason = "axum handlers are async functions")]
pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: String::from("ok"),
        version: env!("CARGO_PKG_VERSION").to_owned(),
    })
}

fn failure(status: MachineStatus, message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ActionResponse::failed(status, message)),
    )
        .into_response()
}
