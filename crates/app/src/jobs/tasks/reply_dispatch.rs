use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::state::AppState;
use redrelay_core::domain::state::ConversationState;
use redrelay_core::text::{is_removed, markdown_hard_breaks};
use redrelay_infra::reddit::RedditError;
use redrelay_infra::store::StoreError;

#[derive(Debug, Default, Serialize)]
pub struct DispatchStats {
    pub pending: usize,
    pub delivered: usize,
    pub skipped_answered: usize,
    pub skipped_removed: usize,
    pub discarded_replies: usize,
    pub errors: usize,
    pub throttled: bool,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("thread error: {0}")]
    Thread(#[from] RedditError),
}

/// One dispatch pass: for every comment with buffered replies, post the
/// first reply back on the thread. The conversation is marked answered
/// before posting, so a crash mid-pass loses a reply rather than
/// duplicating one.
pub async fn run(state: &AppState) -> Result<DispatchStats, DispatchError> {
    let mut stats = DispatchStats::default();
    if let Some(cooldown) = state.reddit.rate_limit().throttle(Utc::now()) {
        warn!(
            cooldown_secs = cooldown.as_secs(),
            "rate limit budget low, skipping dispatch pass"
        );
        stats.throttled = true;
        return Ok(stats);
    }

    let pending = state.store.pending_reply_ids().await?;
    stats.pending = pending.len();

    for comment_id in &pending {
        match state.store.state(comment_id).await? {
            Some(ConversationState::Answered) | Some(ConversationState::BreakClosed) => {
                stats.skipped_answered += 1;
                continue;
            }
            _ => {}
        }

        // Claim first. A concurrent or replayed pass sees the answered
        // state and skips this comment.
        state
            .store
            .set_state(comment_id, ConversationState::Answered)
            .await?;
        let replies = state.store.take_replies(comment_id).await?;
        let Some(first) = replies.first() else {
            debug!(comment_id, "pending id without buffered replies");
            continue;
        };
        if replies.len() > 1 {
            stats.discarded_replies += replies.len() - 1;
            debug!(
                comment_id,
                discarded = replies.len() - 1,
                "extra buffered replies discarded"
            );
        }

        match state.reddit.fetch_comment(comment_id).await {
            Ok(Some(comment)) if !is_removed(&comment) => {
                let body = markdown_hard_breaks(first);
                match state.reddit.post_reply(comment_id, &body).await {
                    Ok(()) => {
                        info!(comment_id, "reply posted");
                        stats.delivered += 1;
                    }
                    Err(err) => {
                        warn!(error = %err, comment_id, "posting reply failed");
                        stats.errors += 1;
                    }
                }
            }
            Ok(_) => {
                debug!(comment_id, "source comment gone or removed, reply withheld");
                stats.skipped_removed += 1;
            }
            Err(err) => {
                warn!(error = %err, comment_id, "fetching source comment failed");
                stats.errors += 1;
            }
        }
    }

    state.store.clear_pending_reply_ids().await?;
    Ok(stats)
}
