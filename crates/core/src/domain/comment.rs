use serde::{Deserialize, Serialize};

/// Snapshot of one comment as read from the thread. Not owned by this
/// system; the live comment may change after the snapshot is taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadComment {
    pub id: String,
    pub body: String,
    /// Absent when the account was deleted.
    pub author: Option<String>,
    /// Removed by a moderator.
    pub removed: bool,
    /// Authors of existing direct replies.
    pub reply_authors: Vec<String>,
    /// A "load more comments" stub, not a real comment.
    pub is_continuation: bool,
}

impl ThreadComment {
    pub fn author_str(&self) -> &str {
        self.author.as_deref().unwrap_or("")
    }
}

/// One entry of the forwarding queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedComment {
    pub id: String,
    pub body: String,
    pub author: String,
    /// Forwarding attempts so far; bounds the retry loop.
    #[serde(default)]
    pub attempts: u32,
}

impl QueuedComment {
    pub fn new(id: impl Into<String>, body: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            author: author.into(),
            attempts: 0,
        }
    }
}
