use tracing::{info, warn};

use redrelay_core::domain::state::ConversationState;
use redrelay_core::text::{ReplyKind, classify_reply};
use redrelay_infra::store::{ConversationStore, StoreError};

/// What the webhook handler did with one chatbot reply event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// No mapping for the message id; stale, duplicate, or foreign event.
    Unmatched,
    /// Empty-payload sentinel, nothing to relay.
    Ignored,
    /// Break sentinel; the conversation is closed for good.
    BreakClosed { comment_id: String },
    /// Reply text buffered for the next dispatch pass.
    Buffered { comment_id: String },
}

/// Correlates one reply event back to its source comment. The mapping is
/// consumed on first sight, so replaying the same event is harmless.
pub async fn handle_reply_event(
    store: &ConversationStore,
    message_id: &str,
    text: &str,
) -> Result<ReplyOutcome, StoreError> {
    let Some(comment_id) = store.take_mapping(message_id).await? else {
        warn!(message_id, "reply event without a known mapping");
        return Ok(ReplyOutcome::Unmatched);
    };

    match classify_reply(text) {
        ReplyKind::Empty => {
            info!(comment_id, "empty reply payload ignored");
            Ok(ReplyOutcome::Ignored)
        }
        ReplyKind::Break => {
            store
                .set_state(&comment_id, ConversationState::BreakClosed)
                .await?;
            info!(comment_id, "conversation closed by break sentinel");
            Ok(ReplyOutcome::BreakClosed { comment_id })
        }
        ReplyKind::Content => {
            store.append_reply(&comment_id, text).await?;
            info!(comment_id, "reply buffered for dispatch");
            Ok(ReplyOutcome::Buffered { comment_id })
        }
    }
}
