use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{KeyValueStore, StoreError};

enum Value {
    Text(String),
    List(VecDeque<String>),
    Set(Vec<String>),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-memory stand-in for the Redis store, used by tests. Honors expiry
/// on read so TTL-dependent guards behave like the real thing.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn prune(entries: &mut HashMap<String, Entry>, key: &str) {
        let now = Instant::now();
        if entries.get(key).is_some_and(|entry| entry.expired(now)) {
            entries.remove(key);
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        Self::prune(&mut entries, key);
        Ok(entries.get(key).and_then(|entry| match &entry.value {
            Value::Text(text) => Some(text.clone()),
            _ => None,
        }))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        Self::prune(&mut entries, key);
        Ok(entries.remove(key).and_then(|entry| match entry.value {
            Value::Text(text) => Some(text),
            _ => None,
        }))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        entries.remove(key);
        Ok(())
    }

    async fn push_back(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        Self::prune(&mut entries, key);
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::List(VecDeque::new()),
            expires_at: None,
        });
        if let Value::List(list) = &mut entry.value {
            list.push_back(value.to_string());
        }
        Ok(())
    }

    async fn pop_front(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        Self::prune(&mut entries, key);
        let popped = match entries.get_mut(key) {
            Some(Entry {
                value: Value::List(list),
                ..
            }) => list.pop_front(),
            _ => None,
        };
        Ok(popped)
    }

    async fn list_all(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        Self::prune(&mut entries, key);
        Ok(match entries.get(key) {
            Some(Entry {
                value: Value::List(list),
                ..
            }) => list.iter().cloned().collect(),
            _ => Vec::new(),
        })
    }

    async fn add_member(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        Self::prune(&mut entries, key);
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Set(Vec::new()),
            expires_at: None,
        });
        if let Value::Set(set) = &mut entry.value {
            if set.iter().any(|member| member == value) {
                Ok(false)
            } else {
                set.push(value.to_string());
                Ok(true)
            }
        } else {
            Ok(false)
        }
    }

    async fn members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        Self::prune(&mut entries, key);
        Ok(match entries.get(key) {
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => set.clone(),
            _ => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::store::KeyValueStore;
    use std::time::Duration;

    #[tokio::test]
    async fn set_get_take_round_trip() {
        let store = MemoryStore::new();
        store.set("k", "v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(store.take("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let store = MemoryStore::new();
        store
            .set("k", "v", Some(Duration::from_nanos(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_is_fifo() {
        let store = MemoryStore::new();
        store.push_back("q", "a").await.unwrap();
        store.push_back("q", "b").await.unwrap();
        assert_eq!(store.list_all("q").await.unwrap(), vec!["a", "b"]);
        assert_eq!(store.pop_front("q").await.unwrap(), Some("a".to_string()));
        assert_eq!(store.pop_front("q").await.unwrap(), Some("b".to_string()));
        assert_eq!(store.pop_front("q").await.unwrap(), None);
    }

    #[tokio::test]
    async fn add_member_dedupes() {
        let store = MemoryStore::new();
        assert!(store.add_member("s", "x").await.unwrap());
        assert!(!store.add_member("s", "x").await.unwrap());
        assert_eq!(store.members("s").await.unwrap(), vec!["x"]);
    }
}
