use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use thiserror::Error;
use tracing::info;

use crate::jobs::tasks::comment_scan::{self, ScanError, ScanStats};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum AdminScanError {
    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),
}

/// Manual trigger for one scan-and-forward pass.
pub async fn post_scan(
    State(state): State<AppState>,
) -> Result<Json<ScanStats>, AdminScanError> {
    let stats = comment_scan::run(&state).await?;
    info!(?stats, "manual scan pass complete");
    Ok(Json(stats))
}

impl IntoResponse for AdminScanError {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
