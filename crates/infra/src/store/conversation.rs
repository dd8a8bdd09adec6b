use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use redrelay_core::domain::comment::QueuedComment;
use redrelay_core::domain::state::{ConversationRecord, ConversationState};

use super::{KeyValueStore, StoreError};

/// Forwarding queue, one JSON entry per queued comment.
pub const QUEUE_KEY: &str = "reddit_comments";
/// Ids with a non-empty reply buffer, waiting for a dispatch pass.
pub const PENDING_REPLY_IDS_KEY: &str = "comment_ids";

/// Mappings only matter until the chatbot replies; bound the leftovers
/// from conversations that never get one.
const MAPPING_TTL: Duration = Duration::from_secs(24 * 60 * 60);

fn state_key(comment_id: &str) -> String {
    format!("reddit_comment_state_{comment_id}")
}

fn mapping_key(message_id: &str) -> String {
    format!("reddit_message_{message_id}")
}

fn replies_key(comment_id: &str) -> String {
    format!("reddit_replies_{comment_id}")
}

/// Typed facade over the shared key-value store. Injected into both
/// passes and the webhook handler; the only durable record they share.
#[derive(Clone)]
pub struct ConversationStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ConversationStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn state(&self, comment_id: &str) -> Result<Option<ConversationState>, StoreError> {
        let Some(raw) = self.kv.get(&state_key(comment_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<ConversationRecord>(&raw) {
            Ok(record) => Ok(Some(record.state)),
            Err(err) => {
                // A malformed record reads as "unseen" rather than failing
                // the pass.
                warn!(error = %err, comment_id, "malformed conversation record, treating as absent");
                Ok(None)
            }
        }
    }

    /// One write per transition; the TTL comes from the target state.
    pub async fn set_state(
        &self,
        comment_id: &str,
        state: ConversationState,
    ) -> Result<(), StoreError> {
        let record = ConversationRecord::now(state);
        let payload = serde_json::to_string(&record)?;
        self.kv
            .set(&state_key(comment_id), &payload, Some(state.ttl()))
            .await
    }

    pub async fn clear_state(&self, comment_id: &str) -> Result<(), StoreError> {
        self.kv.delete(&state_key(comment_id)).await
    }

    /// Append-if-absent: the state record is the dedup guard, so a comment
    /// id never sits in the queue twice. Returns whether it was enqueued.
    pub async fn enqueue(&self, comment: &QueuedComment) -> Result<bool, StoreError> {
        if self.state(&comment.id).await?.is_some() {
            return Ok(false);
        }
        self.set_state(&comment.id, ConversationState::Queued).await?;
        let payload = serde_json::to_string(comment)?;
        self.kv.push_back(QUEUE_KEY, &payload).await?;
        Ok(true)
    }

    /// Puts a failed forwarding attempt back at the end of the queue.
    /// The caller has already bumped `attempts`.
    pub async fn requeue(&self, comment: &QueuedComment) -> Result<(), StoreError> {
        self.set_state(&comment.id, ConversationState::Queued).await?;
        let payload = serde_json::to_string(comment)?;
        self.kv.push_back(QUEUE_KEY, &payload).await?;
        Ok(())
    }

    /// Strict FIFO drain, one element at a time. Malformed entries are
    /// logged and skipped, never fatal.
    pub async fn pop_queued(&self) -> Result<Option<QueuedComment>, StoreError> {
        while let Some(raw) = self.kv.pop_front(QUEUE_KEY).await? {
            match serde_json::from_str::<QueuedComment>(&raw) {
                Ok(comment) => return Ok(Some(comment)),
                Err(err) => {
                    warn!(error = %err, "skipping malformed queue entry");
                }
            }
        }
        Ok(None)
    }

    pub async fn record_mapping(
        &self,
        message_id: &str,
        comment_id: &str,
    ) -> Result<(), StoreError> {
        self.kv
            .set(&mapping_key(message_id), comment_id, Some(MAPPING_TTL))
            .await
    }

    /// Consumes the mapping: a reply event correlates at most once.
    pub async fn take_mapping(&self, message_id: &str) -> Result<Option<String>, StoreError> {
        self.kv.take(&mapping_key(message_id)).await
    }

    /// Buffers one reply and marks the comment as pending dispatch.
    pub async fn append_reply(&self, comment_id: &str, text: &str) -> Result<(), StoreError> {
        self.kv.push_back(&replies_key(comment_id), text).await?;
        self.kv.add_member(PENDING_REPLY_IDS_KEY, comment_id).await?;
        Ok(())
    }

    pub async fn pending_reply_ids(&self) -> Result<Vec<String>, StoreError> {
        self.kv.members(PENDING_REPLY_IDS_KEY).await
    }

    /// Returns the buffered replies in arrival order and deletes the
    /// buffer, whatever the caller then does with them.
    pub async fn take_replies(&self, comment_id: &str) -> Result<Vec<String>, StoreError> {
        let key = replies_key(comment_id);
        let replies = self.kv.list_all(&key).await?;
        self.kv.delete(&key).await?;
        Ok(replies)
    }

    pub async fn clear_pending_reply_ids(&self) -> Result<(), StoreError> {
        self.kv.delete(PENDING_REPLY_IDS_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::ConversationStore;
    use crate::store::MemoryStore;
    use redrelay_core::domain::comment::QueuedComment;
    use redrelay_core::domain::state::ConversationState;

    fn store() -> ConversationStore {
        ConversationStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn enqueue_rejects_duplicate_ids() {
        let store = store();
        let comment = QueuedComment::new("abc", "hi", "alice");
        assert!(store.enqueue(&comment).await.unwrap());
        assert!(!store.enqueue(&comment).await.unwrap());
        assert_eq!(
            store.state("abc").await.unwrap(),
            Some(ConversationState::Queued)
        );
    }

    #[tokio::test]
    async fn queue_drains_in_fifo_order() {
        let store = store();
        for id in ["c1", "c2", "c3"] {
            store
                .enqueue(&QueuedComment::new(id, "body", "alice"))
                .await
                .unwrap();
        }
        assert_eq!(store.pop_queued().await.unwrap().unwrap().id, "c1");
        assert_eq!(store.pop_queued().await.unwrap().unwrap().id, "c2");
        assert_eq!(store.pop_queued().await.unwrap().unwrap().id, "c3");
        assert!(store.pop_queued().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn requeue_appends_at_the_back() {
        let store = store();
        store
            .enqueue(&QueuedComment::new("c1", "body", "alice"))
            .await
            .unwrap();
        store
            .enqueue(&QueuedComment::new("c2", "body", "bob"))
            .await
            .unwrap();
        let mut failed = store.pop_queued().await.unwrap().unwrap();
        failed.attempts += 1;
        store.requeue(&failed).await.unwrap();
        assert_eq!(store.pop_queued().await.unwrap().unwrap().id, "c2");
        let retried = store.pop_queued().await.unwrap().unwrap();
        assert_eq!(retried.id, "c1");
        assert_eq!(retried.attempts, 1);
    }

    #[tokio::test]
    async fn mapping_is_consumed_once() {
        let store = store();
        store.record_mapping("m1", "abc").await.unwrap();
        assert_eq!(
            store.take_mapping("m1").await.unwrap(),
            Some("abc".to_string())
        );
        assert_eq!(store.take_mapping("m1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn replies_buffer_and_pending_index_track_together() {
        let store = store();
        store.append_reply("abc", "r1").await.unwrap();
        store.append_reply("abc", "r2").await.unwrap();
        store.append_reply("xyz", "r3").await.unwrap();

        let mut pending = store.pending_reply_ids().await.unwrap();
        pending.sort();
        assert_eq!(pending, vec!["abc", "xyz"]);

        assert_eq!(store.take_replies("abc").await.unwrap(), vec!["r1", "r2"]);
        assert!(store.take_replies("abc").await.unwrap().is_empty());

        store.clear_pending_reply_ids().await.unwrap();
        assert!(store.pending_reply_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_queue_entries_are_skipped() {
        let kv = Arc::new(MemoryStore::new());
        {
            use crate::store::KeyValueStore;
            kv.push_back(super::QUEUE_KEY, "not json").await.unwrap();
            kv.push_back(
                super::QUEUE_KEY,
                &serde_json::to_string(&QueuedComment::new("ok", "body", "alice")).unwrap(),
            )
            .await
            .unwrap();
        }
        let store = ConversationStore::new(kv);
        assert_eq!(store.pop_queued().await.unwrap().unwrap().id, "ok");
    }

    #[tokio::test]
    async fn clear_state_forgets_the_comment() {
        let store = store();
        store
            .set_state("abc", ConversationState::Forwarded)
            .await
            .unwrap();
        store.clear_state("abc").await.unwrap();
        assert_eq!(store.state("abc").await.unwrap(), None);
    }
}
