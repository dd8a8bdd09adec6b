use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use redrelay_core::domain::comment::ThreadComment;
use redrelay_core::ratelimit::RateLimitWindow;

use super::{CommentPage, RedditError, ThreadApi};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_BASE: &str = "https://oauth.reddit.com";

const HEADER_REMAINING: &str = "x-ratelimit-remaining";
const HEADER_RESET: &str = "x-ratelimit-reset";

/// Refresh the token this long before the provider would reject it.
const TOKEN_SLACK_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct RedditClient {
    http: reqwest::Client,
    credentials: RedditCredentials,
    token: Mutex<Option<CachedToken>>,
    window: Mutex<RateLimitWindow>,
}

impl RedditClient {
    pub fn new(http: reqwest::Client, credentials: RedditCredentials) -> Self {
        // Until the first response reports real numbers, assume a fresh
        // window so the breaker does not trip before any call is made.
        let window = RateLimitWindow::new(600.0, Utc::now() + ChronoDuration::seconds(600));
        Self {
            http,
            credentials,
            token: Mutex::new(None),
            window: Mutex::new(window),
        }
    }

    async fn bearer_token(&self) -> Result<String, RedditError> {
        let now = Utc::now();
        if let Some(cached) = self.token.lock().expect("token lock poisoned").clone() {
            if cached.expires_at - ChronoDuration::seconds(TOKEN_SLACK_SECS) > now {
                return Ok(cached.value);
            }
        }
        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .header("User-Agent", &self.credentials.user_agent)
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RedditError::Auth(format!("token request failed: {status}")));
        }
        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|_| RedditError::InvalidResponse("token payload"))?;
        if payload.access_token.is_empty() {
            return Err(RedditError::Auth("empty access token".to_string()));
        }
        let cached = CachedToken {
            value: payload.access_token.clone(),
            expires_at: now + ChronoDuration::seconds(payload.expires_in),
        };
        *self.token.lock().expect("token lock poisoned") = Some(cached);
        Ok(payload.access_token)
    }

    fn record_rate_limit(&self, headers: &HeaderMap) {
        let Some(window) = parse_rate_limit(headers, Utc::now()) else {
            return;
        };
        debug!(
            remaining = window.remaining,
            reset_at = %window.reset_at,
            "rate limit window updated"
        );
        *self.window.lock().expect("window lock poisoned") = window;
    }

    async fn get_json(&self, url: &str) -> Result<Value, RedditError> {
        let token = self.bearer_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .header("User-Agent", &self.credentials.user_agent)
            .send()
            .await?;
        self.record_rate_limit(response.headers());
        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Value, RedditError> {
        let token = self.bearer_token().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .header("User-Agent", &self.credentials.user_agent)
            .form(form)
            .send()
            .await?;
        self.record_rate_limit(response.headers());
        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ThreadApi for RedditClient {
    async fn comment_tree(&self, submission_id: &str) -> Result<CommentPage, RedditError> {
        let url = format!(
            "{OAUTH_BASE}/comments/{submission_id}?sort=new&limit=500&raw_json=1"
        );
        let payload = self.get_json(&url).await?;
        // The endpoint returns [post listing, comment listing].
        let listing = payload
            .get(1)
            .ok_or(RedditError::InvalidResponse("comment listing"))?;
        let mut page = CommentPage::default();
        collect_forest(listing_children(listing), &mut page);
        Ok(page)
    }

    async fn expand_more(
        &self,
        submission_id: &str,
        children: &[String],
    ) -> Result<CommentPage, RedditError> {
        let url = format!(
            "{OAUTH_BASE}/api/morechildren?api_type=json&raw_json=1&sort=new&link_id=t3_{submission_id}&children={}",
            children.join(",")
        );
        let payload = self.get_json(&url).await?;
        let things = payload
            .pointer("/json/data/things")
            .and_then(Value::as_array)
            .ok_or(RedditError::InvalidResponse("morechildren things"))?;
        let mut page = CommentPage::default();
        collect_forest(things.iter(), &mut page);
        Ok(page)
    }

    async fn fetch_comment(&self, comment_id: &str) -> Result<Option<ThreadComment>, RedditError> {
        let url = format!("{OAUTH_BASE}/api/info?id=t1_{comment_id}&raw_json=1");
        let payload = self.get_json(&url).await?;
        let mut page = CommentPage::default();
        collect_forest(listing_children(&payload), &mut page);
        Ok(page.comments.into_iter().next())
    }

    async fn post_reply(&self, comment_id: &str, body: &str) -> Result<(), RedditError> {
        let thing_id = format!("t1_{comment_id}");
        let payload = self
            .post_form(
                &format!("{OAUTH_BASE}/api/comment"),
                &[
                    ("api_type", "json"),
                    ("thing_id", thing_id.as_str()),
                    ("text", body),
                ],
            )
            .await?;
        if let Some(message) = api_error(&payload) {
            return Err(RedditError::Api(message));
        }
        Ok(())
    }

    fn rate_limit(&self) -> RateLimitWindow {
        *self.window.lock().expect("window lock poisoned")
    }
}

fn parse_rate_limit(headers: &HeaderMap, now: DateTime<Utc>) -> Option<RateLimitWindow> {
    let remaining: f64 = headers
        .get(HEADER_REMAINING)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    let reset_secs: f64 = headers
        .get(HEADER_RESET)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    Some(RateLimitWindow::new(
        remaining,
        now + ChronoDuration::seconds(reset_secs as i64),
    ))
}

fn listing_children(listing: &Value) -> impl Iterator<Item = &Value> {
    listing
        .pointer("/data/children")
        .and_then(Value::as_array)
        .map(|children| children.iter())
        .into_iter()
        .flatten()
}

/// Flattens a comment forest depth-first, matching the order the thread
/// displays: a parent is always seen before its replies.
fn collect_forest<'a>(children: impl Iterator<Item = &'a Value>, page: &mut CommentPage) {
    for child in children {
        let kind = child.get("kind").and_then(Value::as_str).unwrap_or("");
        let Some(data) = child.get("data") else {
            continue;
        };
        match kind {
            "t1" => {
                page.comments.push(comment_from_data(data));
                collect_forest(listing_children(&data["replies"]), page);
            }
            "more" => {
                if let Some(ids) = data.get("children").and_then(Value::as_array) {
                    page.more.extend(
                        ids.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string),
                    );
                }
            }
            _ => {}
        }
    }
}

fn comment_from_data(data: &Value) -> ThreadComment {
    let reply_authors = listing_children(&data["replies"])
        .filter(|child| child.get("kind").and_then(Value::as_str) == Some("t1"))
        .filter_map(|child| child.pointer("/data/author").and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    ThreadComment {
        id: data
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        body: data
            .get("body")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        author: data
            .get("author")
            .and_then(Value::as_str)
            .filter(|author| !author.is_empty() && *author != "[deleted]")
            .map(str::to_string),
        removed: is_banned(data.get("banned_by")),
        reply_authors,
        is_continuation: false,
    }
}

fn is_banned(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(_)) => true,
        _ => false,
    }
}

fn api_error(payload: &Value) -> Option<String> {
    let errors = payload.pointer("/json/errors").and_then(Value::as_array)?;
    if errors.is_empty() {
        return None;
    }
    Some(
        errors
            .iter()
            .map(|entry| entry.to_string())
            .collect::<Vec<_>>()
            .join(", "),
    )
}
