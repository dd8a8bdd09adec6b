use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use thiserror::Error;
use tracing::info;

use crate::jobs::tasks::reply_dispatch::{self, DispatchError, DispatchStats};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum AdminDispatchError {
    #[error("dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Manual trigger for one reply dispatch pass.
pub async fn post_dispatch(
    State(state): State<AppState>,
) -> Result<Json<DispatchStats>, AdminDispatchError> {
    let stats = reply_dispatch::run(&state).await?;
    info!(?stats, "manual dispatch pass complete");
    Ok(Json(stats))
}

impl IntoResponse for AdminDispatchError {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
