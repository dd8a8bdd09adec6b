use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use super::{ChatbotApi, ChatbotEnv, ChatbotError};

/// Provisioning is a quick existence check upstream; fail it fast rather
/// than stalling the whole pass.
const CREATE_USER_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ChatbotCredentials {
    pub client_id: String,
    pub auth_key: String,
    pub business_id: i64,
}

pub struct ChatbotClient {
    http: reqwest::Client,
    env: ChatbotEnv,
    credentials: ChatbotCredentials,
}

impl ChatbotClient {
    pub fn new(http: reqwest::Client, env: ChatbotEnv, credentials: ChatbotCredentials) -> Self {
        Self {
            http,
            env,
            credentials,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.env.base_url())
    }
}

#[async_trait]
impl ChatbotApi for ChatbotClient {
    async fn create_user(&self, auth_id: &str) -> Result<(), ChatbotError> {
        let response = self
            .http
            .post(self.endpoint("/user/"))
            .header("client-id", &self.credentials.client_id)
            .header("Authorization", &self.credentials.auth_key)
            .timeout(CREATE_USER_TIMEOUT)
            .json(&json!({ "auth_id": auth_id }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatbotError::Status {
                status: status.as_u16(),
                body,
            });
        }
        info!(auth_id, "chatbot user provisioned");
        Ok(())
    }

    async fn log_message(&self, auth_id: &str, body: &str) -> Result<String, ChatbotError> {
        let response = self
            .http
            .post(self.endpoint("/log_message_from_user/"))
            .header("client-id", &self.credentials.client_id)
            .header("Authorization", &self.credentials.auth_key)
            .json(&json!({
                "user": { "auth_id": auth_id },
                "message_body": body,
                "message_type": 0,
                "business_id": self.credentials.business_id,
            }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatbotError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let payload: Value = response.json().await?;
        let message_id = extract_message_id(&payload)
            .ok_or(ChatbotError::InvalidResponse("message_id"))?;
        info!(auth_id, message_id = %message_id, "message logged to chatbot");
        Ok(message_id)
    }
}

/// The backend has been seen returning both string and numeric ids.
fn extract_message_id(payload: &Value) -> Option<String> {
    match payload.get("message_id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
