pub mod client;

pub use client::{ChatbotClient, ChatbotCredentials};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatbotError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(&'static str),
}

/// Production and pre-production backends expose the same API on
/// different hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatbotEnv {
    Production,
    Preprod,
}

impl ChatbotEnv {
    pub fn base_url(self) -> &'static str {
        match self {
            ChatbotEnv::Production => "https://us-messenger.haptikapi.com/v1.0",
            ChatbotEnv::Preprod => "https://us-messenger.hellohaptik.com/v1.0",
        }
    }
}

/// Write boundary to the chatbot backend: provision a per-comment user,
/// then log the comment body as a message from that user. Replies come
/// back later through the webhook, never on this call path.
#[async_trait]
pub trait ChatbotApi: Send + Sync {
    async fn create_user(&self, auth_id: &str) -> Result<(), ChatbotError>;
    /// Returns the provider-assigned message id used for correlation.
    async fn log_message(&self, auth_id: &str, body: &str) -> Result<String, ChatbotError>;
}
