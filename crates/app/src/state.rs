use std::sync::Arc;

use crate::config::AppConfig;
use redrelay_infra::chatbot::ChatbotApi;
use redrelay_infra::reddit::ThreadApi;
use redrelay_infra::store::ConversationStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: ConversationStore,
    pub reddit: Arc<dyn ThreadApi>,
    pub chatbot: Arc<dyn ChatbotApi>,
}
