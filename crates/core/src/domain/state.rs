use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Answered records only need to cover the window in which overlapping
/// dispatch runs could double-deliver.
const ANSWERED_TTL: Duration = Duration::from_secs(30 * 60);
/// A break closes the conversation for good; a month is "indefinitely"
/// without leaking keys forever.
const BREAK_CLOSED_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
/// Queued/forwarded records double as the queue dedup guard, so they must
/// outlive any realistic gap between a scan and the matching dispatch.
const IN_FLIGHT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Where a comment sits in its conversation lifecycle. Absence of a record
/// means the comment has not been seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Accepted by the filter, waiting in the forwarding queue.
    Queued,
    /// Sent to the chatbot, reply not yet delivered.
    Forwarded,
    /// A reply delivery was claimed for this comment.
    Answered,
    /// The chatbot signalled a conversational dead end.
    BreakClosed,
}

impl ConversationState {
    pub fn ttl(self) -> Duration {
        match self {
            ConversationState::Queued | ConversationState::Forwarded => IN_FLIGHT_TTL,
            ConversationState::Answered => ANSWERED_TTL,
            ConversationState::BreakClosed => BREAK_CLOSED_TTL,
        }
    }
}

/// The single durable record per comment, written with one store write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub state: ConversationState,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn now(state: ConversationState) -> Self {
        Self {
            state,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConversationState;

    #[test]
    fn answered_expires_before_break_closed() {
        assert!(ConversationState::Answered.ttl() < ConversationState::BreakClosed.ttl());
    }

    #[test]
    fn answered_ttl_is_thirty_minutes() {
        assert_eq!(ConversationState::Answered.ttl().as_secs(), 1800);
    }

    #[test]
    fn break_closed_ttl_is_thirty_days() {
        assert_eq!(ConversationState::BreakClosed.ttl().as_secs(), 2_592_000);
    }
}
