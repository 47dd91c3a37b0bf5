// jmap-core/src/config.rs
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const SESSION_URL_ENV: &str = "JMAP_SESSION_URL";
pub const TOKEN_ENV: &str = "JMAP_TOKEN";

/// Client construction parameters.
#[derive(Clone, Deserialize, Serialize, PartialEq)]
pub struct ClientConfig {
    /// Session discovery URL, e.g. `https://api.fastmail.com/jmap/session`
    pub session_url: String,
    /// Bearer token sent on every request
    pub token: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Additional attempts after a transport failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// How long a fetched session is reused before it is fetched again
    #[serde(default = "default_session_ttl_ms")]
    pub session_ttl_ms: u64,
    /// Log request and response bodies at debug level
    #[serde(default)]
    pub log_requests: bool,
}

fn default_user_agent() -> String {
    concat!("jmap-core/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1_000
}

fn default_max_batch_size() -> usize {
    50
}

fn default_session_ttl_ms() -> u64 {
    300_000
}

// Keeps the token out of debug output.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("session_url", &self.session_url)
            .field("token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("max_batch_size", &self.max_batch_size)
            .field("session_ttl_ms", &self.session_ttl_ms)
            .field("log_requests", &self.log_requests)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(session_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            session_url: session_url.into(),
            token: token.into(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_batch_size: default_max_batch_size(),
            session_ttl_ms: default_session_ttl_ms(),
            log_requests: false,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl_ms = ttl.as_millis() as u64;
        self
    }

    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_millis(self.session_ttl_ms)
    }

    /// Headers sent with every session and API request.
    pub(crate) fn request_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Authorization", format!("Bearer {}", self.token)),
            ("Content-Type", "application/json".to_string()),
            ("User-Agent", self.user_agent.clone()),
        ]
    }

    /// Parse a TOML document. Missing optional keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config = Self::parse_toml(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::parse_toml(&content)?.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn parse_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Configuration(format!("invalid config: {}", e)))
    }

    /// Build a config from `JMAP_SESSION_URL` and `JMAP_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let session_url = std::env::var(SESSION_URL_ENV)
            .map_err(|_| Error::Configuration(format!("{} is not set", SESSION_URL_ENV)))?;
        let token = std::env::var(TOKEN_ENV)
            .map_err(|_| Error::Configuration(format!("{} is not set", TOKEN_ENV)))?;
        let config = Self::new(session_url, token);
        config.validate()?;
        Ok(config)
    }

    /// Let `JMAP_SESSION_URL` and `JMAP_TOKEN` override loaded values
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(session_url) = std::env::var(SESSION_URL_ENV) {
            self.session_url = session_url;
        }
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            self.token = token;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_url.trim().is_empty() {
            return Err(Error::Configuration("session URL is required".to_string()));
        }
        if self.token.trim().is_empty() {
            return Err(Error::Configuration("bearer token is required".to_string()));
        }

        let url = url::Url::parse(&self.session_url).map_err(|e| {
            Error::Configuration(format!("invalid session URL {}: {}", self.session_url, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::Configuration(format!(
                "session URL must be http or https, got {}",
                url.scheme()
            )));
        }

        if self.max_batch_size == 0 {
            return Err(Error::Configuration(
                "max batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
