pub mod scheduler;
pub mod tasks;

use thiserror::Error;
use tracing::{info, warn};

use crate::state::AppState;
use tasks::comment_scan::ScanError;
use tasks::reply_dispatch::DispatchError;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

pub async fn start(state: AppState, once: bool) -> Result<(), JobError> {
    if once {
        let stats = tasks::comment_scan::run(&state).await?;
        info!(?stats, "scan pass complete");
        let stats = tasks::reply_dispatch::run(&state).await?;
        info!(?stats, "dispatch pass complete");
        return Ok(());
    }

    let scan_interval = state.config.scan_interval;
    let scan_state = state.clone();
    let scan_job = scheduler::run_interval("comment_scan", scan_interval, move || {
        let state = scan_state.clone();
        async move {
            match tasks::comment_scan::run(&state).await {
                Ok(stats) => info!(?stats, "scan pass complete"),
                Err(err) => warn!(error = %err, "scan pass failed"),
            }
            Ok(())
        }
    });

    let dispatch_interval = state.config.dispatch_interval;
    let dispatch_state = state.clone();
    let dispatch_job = scheduler::run_interval("reply_dispatch", dispatch_interval, move || {
        let state = dispatch_state.clone();
        async move {
            match tasks::reply_dispatch::run(&state).await {
                Ok(stats) => info!(?stats, "dispatch pass complete"),
                Err(err) => warn!(error = %err, "dispatch pass failed"),
            }
            Ok(())
        }
    });

    tokio::try_join!(scan_job, dispatch_job)?;
    Ok(())
}
