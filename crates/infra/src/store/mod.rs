pub mod conversation;
pub mod memory;
pub mod redis;

pub use conversation::ConversationStore;
pub use memory::MemoryStore;
pub use redis::RedisStore;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The shared key-value store both passes coordinate through. String
/// values with optional expiry, plus the list/set primitives the queue,
/// reply buffers and pending index need. Implementations must make
/// `take`, `push_back`/`pop_front` and `add_member` atomic so the
/// read-modify-write races of a serialized-blob design cannot occur.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;
    /// Read and delete in one step; `None` when the key was absent.
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn push_back(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn pop_front(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn list_all(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Set-semantics insert; `true` when the member was newly added.
    async fn add_member(&self, key: &str, value: &str) -> Result<bool, StoreError>;
    async fn members(&self, key: &str) -> Result<Vec<String>, StoreError>;
}
