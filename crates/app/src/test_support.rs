use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use crate::config::AppConfig;
use crate::state::AppState;
use redrelay_core::domain::comment::ThreadComment;
use redrelay_core::ratelimit::RateLimitWindow;
use redrelay_infra::chatbot::{ChatbotApi, ChatbotCredentials, ChatbotEnv, ChatbotError};
use redrelay_infra::reddit::{CommentPage, RedditCredentials, RedditError, ThreadApi};
use redrelay_infra::store::{ConversationStore, MemoryStore};

pub fn comment(id: &str, body: &str, author: &str) -> ThreadComment {
    ThreadComment {
        id: id.to_string(),
        body: body.to_string(),
        author: Some(author.to_string()),
        removed: false,
        reply_authors: vec![],
        is_continuation: false,
    }
}

/// In-memory thread with scripted pages and a controllable rate limit.
#[derive(Default)]
pub struct FakeThread {
    tree: Mutex<CommentPage>,
    more_pages: Mutex<VecDeque<CommentPage>>,
    by_id: Mutex<HashMap<String, ThreadComment>>,
    posted: Mutex<Vec<(String, String)>>,
    remaining: Mutex<Option<f64>>,
}

impl FakeThread {
    pub fn set_tree(&self, page: CommentPage) {
        *self.tree.lock().unwrap() = page;
    }

    pub fn push_more_page(&self, page: CommentPage) {
        self.more_pages.lock().unwrap().push_back(page);
    }

    pub fn insert_comment(&self, comment: ThreadComment) {
        self.by_id
            .lock()
            .unwrap()
            .insert(comment.id.clone(), comment);
    }

    pub fn set_remaining(&self, remaining: f64) {
        *self.remaining.lock().unwrap() = Some(remaining);
    }

    pub fn posted(&self) -> Vec<(String, String)> {
        self.posted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ThreadApi for FakeThread {
    async fn comment_tree(&self, _submission_id: &str) -> Result<CommentPage, RedditError> {
        Ok(self.tree.lock().unwrap().clone())
    }

    async fn expand_more(
        &self,
        _submission_id: &str,
        _children: &[String],
    ) -> Result<CommentPage, RedditError> {
        Ok(self
            .more_pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn fetch_comment(&self, comment_id: &str) -> Result<Option<ThreadComment>, RedditError> {
        Ok(self.by_id.lock().unwrap().get(comment_id).cloned())
    }

    async fn post_reply(&self, comment_id: &str, body: &str) -> Result<(), RedditError> {
        self.posted
            .lock()
            .unwrap()
            .push((comment_id.to_string(), body.to_string()));
        Ok(())
    }

    fn rate_limit(&self) -> RateLimitWindow {
        let remaining = self.remaining.lock().unwrap().unwrap_or(600.0);
        RateLimitWindow::new(remaining, Utc::now() + ChronoDuration::seconds(600))
    }
}

/// Records forwarded traffic and assigns sequential message ids.
#[derive(Default)]
pub struct FakeChatbot {
    created: Mutex<Vec<String>>,
    messages: Mutex<Vec<(String, String)>>,
    fail_remaining: Mutex<usize>,
    next_id: Mutex<usize>,
}

impl FakeChatbot {
    pub fn fail_log_message(&self, count: usize) {
        *self.fail_remaining.lock().unwrap() = count;
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatbotApi for FakeChatbot {
    async fn create_user(&self, auth_id: &str) -> Result<(), ChatbotError> {
        self.created.lock().unwrap().push(auth_id.to_string());
        Ok(())
    }

    async fn log_message(&self, auth_id: &str, body: &str) -> Result<String, ChatbotError> {
        {
            let mut fail = self.fail_remaining.lock().unwrap();
            if *fail > 0 {
                *fail = fail.saturating_sub(1);
                return Err(ChatbotError::Status {
                    status: 500,
                    body: "injected failure".to_string(),
                });
            }
        }
        self.messages
            .lock()
            .unwrap()
            .push((auth_id.to_string(), body.to_string()));
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        Ok(format!("m{next}"))
    }
}

pub struct TestHarness {
    pub reddit: Arc<FakeThread>,
    pub chatbot: Arc<FakeChatbot>,
    pub store: ConversationStore,
    pub bot_identity: String,
    config: AppConfig,
}

impl TestHarness {
    pub fn new() -> Self {
        let bot_identity = "relay_bot".to_string();
        let config = AppConfig {
            http_addr: "127.0.0.1:0".parse().unwrap(),
            redis_url: "redis://unused".to_string(),
            reddit: RedditCredentials {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
                username: bot_identity.clone(),
                password: "password".to_string(),
                user_agent: "redrelay-test".to_string(),
            },
            submission_id: "sub1".to_string(),
            chatbot: ChatbotCredentials {
                client_id: "cid".to_string(),
                auth_key: "key".to_string(),
                business_id: 7,
            },
            chatbot_env: ChatbotEnv::Preprod,
            scan_interval: Duration::from_secs(300),
            dispatch_interval: Duration::from_secs(60),
            request_timeout: Duration::from_secs(15),
            webhook_secret: None,
            admin_token: None,
        };
        Self {
            reddit: Arc::new(FakeThread::default()),
            chatbot: Arc::new(FakeChatbot::default()),
            store: ConversationStore::new(Arc::new(MemoryStore::new())),
            bot_identity,
            config,
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            config: Arc::new(self.config.clone()),
            store: self.store.clone(),
            reddit: self.reddit.clone(),
            chatbot: self.chatbot.clone(),
        }
    }
}
