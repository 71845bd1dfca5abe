//! External command surface: the companion application's entry point.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use promptrelay_protocol::{CommandReply, Envelope, ExternalCommand};
use serde_json::Value;
use tracing::warn;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/command", post(command))
        .route("/tabs", get(tabs))
}

/// POST /api/command: `{"action": ..., ...}` in, envelope out.
async fn command(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<CommandReply>) {
    let command: ExternalCommand = match serde_json::from_value(body) {
        Ok(command) => command,
        Err(e) => {
            warn!("Rejected command: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(Envelope::err(format!("Invalid command: {}", e))),
            );
        }
    };
    (StatusCode::OK, Json(state.coordinator.execute(command).await))
}

/// GET /api/tabs: shorthand for `checkConnection`.
async fn tabs(State(state): State<Arc<AppState>>) -> Json<CommandReply> {
    Json(state.coordinator.execute(ExternalCommand::CheckConnection).await)
}
