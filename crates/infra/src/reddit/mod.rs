pub mod client;

pub use client::{RedditClient, RedditCredentials};

use async_trait::async_trait;
use thiserror::Error;

use redrelay_core::domain::comment::ThreadComment;
use redrelay_core::ratelimit::RateLimitWindow;

#[derive(Debug, Error)]
pub enum RedditError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("api error: {0}")]
    Api(String),
    #[error("invalid response: {0}")]
    InvalidResponse(&'static str),
}

/// One page of a submission's comment forest: the real comments found so
/// far plus the ids of collapsed "more comments" stubs still to expand.
#[derive(Debug, Clone, Default)]
pub struct CommentPage {
    pub comments: Vec<ThreadComment>,
    pub more: Vec<String>,
}

/// Read/write boundary to the discussion thread provider.
#[async_trait]
pub trait ThreadApi: Send + Sync {
    /// Full comment forest of the submission, flattened, newest sort.
    async fn comment_tree(&self, submission_id: &str) -> Result<CommentPage, RedditError>;
    /// Resolves collapsed continuation stubs into further comments.
    async fn expand_more(
        &self,
        submission_id: &str,
        children: &[String],
    ) -> Result<CommentPage, RedditError>;
    /// Fresh snapshot of a single comment; `None` when it no longer exists.
    async fn fetch_comment(&self, comment_id: &str) -> Result<Option<ThreadComment>, RedditError>;
    async fn post_reply(&self, comment_id: &str, body: &str) -> Result<(), RedditError>;
    /// Provider-reported budget as of the most recent call.
    fn rate_limit(&self) -> RateLimitWindow;
}
