use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use redrelay_infra::chatbot::{ChatbotCredentials, ChatbotEnv};
use redrelay_infra::reddit::RedditCredentials;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub redis_url: String,
    pub reddit: RedditCredentials,
    pub submission_id: String,
    pub chatbot: ChatbotCredentials,
    pub chatbot_env: ChatbotEnv,
    pub scan_interval: Duration,
    pub dispatch_interval: Duration,
    pub request_timeout: Duration,
    pub webhook_secret: Option<String>,
    pub admin_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid socket address: {0}")]
    InvalidSocket(String),
    #[error("invalid integer for {0}: {1}")]
    InvalidNumber(&'static str, String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
    #[error("missing required variable {0}")]
    Missing(&'static str),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr_raw = read_string("REDRELAY_HTTP_ADDR", "127.0.0.1:8080");
        let http_addr = http_addr_raw
            .parse()
            .map_err(|_| ConfigError::InvalidSocket(http_addr_raw.clone()))?;
        let redis_url = read_string("REDRELAY_REDIS_URL", "redis://127.0.0.1:6379");

        let reddit = RedditCredentials {
            client_id: read_required("REDRELAY_REDDIT_CLIENT_ID")?,
            client_secret: read_required("REDRELAY_REDDIT_CLIENT_SECRET")?,
            username: read_required("REDRELAY_REDDIT_USERNAME")?,
            password: read_required("REDRELAY_REDDIT_PASSWORD")?,
            user_agent: read_string("REDRELAY_REDDIT_USER_AGENT", "redrelay/0.1"),
        };
        let submission_id = read_required("REDRELAY_SUBMISSION_ID")?;

        let chatbot = ChatbotCredentials {
            client_id: read_required("REDRELAY_CHATBOT_CLIENT_ID")?,
            auth_key: read_required("REDRELAY_CHATBOT_AUTH_KEY")?,
            business_id: read_i64("REDRELAY_CHATBOT_BUSINESS_ID")?,
        };
        let chatbot_env = parse_chatbot_env(&read_string("REDRELAY_CHATBOT_ENV", "production"))?;

        let scan_interval_secs = read_u64("REDRELAY_SCAN_INTERVAL_SECS", 300)?;
        let dispatch_interval_secs = read_u64("REDRELAY_DISPATCH_INTERVAL_SECS", 60)?;
        let request_timeout_secs = read_u64("REDRELAY_REQUEST_TIMEOUT_SECS", 15)?;
        let webhook_secret = read_optional_string("REDRELAY_WEBHOOK_SECRET");
        let admin_token = read_optional_string("REDRELAY_ADMIN_TOKEN");

        Ok(Self {
            http_addr,
            redis_url,
            reddit,
            submission_id,
            chatbot,
            chatbot_env,
            scan_interval: Duration::from_secs(scan_interval_secs),
            dispatch_interval: Duration::from_secs(dispatch_interval_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
            webhook_secret,
            admin_token,
        })
    }
}

fn parse_chatbot_env(raw: &str) -> Result<ChatbotEnv, ConfigError> {
    match raw {
        "production" => Ok(ChatbotEnv::Production),
        "preprod" => Ok(ChatbotEnv::Preprod),
        other => Err(ConfigError::InvalidValue(
            "REDRELAY_CHATBOT_ENV",
            other.to_string(),
        )),
    }
}

pub fn load_dotenv() -> Result<(), std::io::Error> {
    let path = Path::new(".env");
    if !path.exists() {
        return Ok(());
    }
    let contents = std::fs::read_to_string(path)?;
    for (key, value) in parse_dotenv(&contents) {
        if std::env::var_os(&key).is_none() {
            // Safety: invoked during startup before any threads are spawned.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }
    Ok(())
}

fn read_string(key: &'static str, default: &'static str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn read_required(key: &'static str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn read_u64(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|_| ConfigError::InvalidNumber(key, raw))
}

fn read_i64(key: &'static str) -> Result<i64, ConfigError> {
    let raw = std::env::var(key).map_err(|_| ConfigError::Missing(key))?;
    raw.parse()
        .map_err(|_| ConfigError::InvalidNumber(key, raw))
}

fn read_optional_string(key: &'static str) -> Option<String> {
    let value = std::env::var(key).unwrap_or_default();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    contents.lines().filter_map(parse_dotenv_line).collect()
}

fn parse_dotenv_line(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let value = parse_dotenv_value(value.trim());
    Some((key.to_string(), value))
}

fn parse_dotenv_value(value: &str) -> String {
    if let Some(stripped) = value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        return unescape_double_quoted(stripped);
    }
    if let Some(stripped) = value
        .strip_prefix('\'')
        .and_then(|inner| inner.strip_suffix('\''))
    {
        return stripped.to_string();
    }
    value.to_string()
}

fn unescape_double_quoted(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => output.push('\n'),
                Some('r') => output.push('\r'),
                Some('t') => output.push('\t'),
                Some('\\') => output.push('\\'),
                Some('"') => output.push('"'),
                Some(other) => {
                    output.push('\\');
                    output.push(other);
                }
                None => output.push('\\'),
            }
        } else {
            output.push(ch);
        }
    }
    output
}
