use std::sync::Arc;

use reqwest::Client;
use thiserror::Error;

use crate::config::AppConfig;
use crate::state::AppState;
use redrelay_infra::chatbot::ChatbotClient;
use redrelay_infra::reddit::RedditClient;
use redrelay_infra::store::{ConversationStore, RedisStore, StoreError};

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub async fn build_state(config: AppConfig) -> Result<AppState, WiringError> {
    let client = Client::builder().timeout(config.request_timeout).build()?;
    let redis = RedisStore::connect(&config.redis_url).await?;
    let store = ConversationStore::new(Arc::new(redis));
    let reddit = RedditClient::new(client.clone(), config.reddit.clone());
    let chatbot = ChatbotClient::new(client, config.chatbot_env, config.chatbot.clone());
    Ok(AppState {
        config: Arc::new(config),
        store,
        reddit: Arc::new(reddit),
        chatbot: Arc::new(chatbot),
    })
}
