// jmap-core/src/http/mod.rs
use async_trait::async_trait;

/// Transport-level failure.
///
/// `status` is `None` when no response was obtained at all, and set when the
/// status line arrived but the body could not be read.
#[derive(Debug, Clone)]
pub struct HttpError {
    pub status: Option<u16>,
    pub message: String,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(status) = self.status {
            write!(f, "HTTP error {}: {}", status, self.message)
        } else {
            write!(f, "HTTP error: {}", self.message)
        }
    }
}

impl std::error::Error for HttpError {}

/// A received HTTP response, whatever its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Request headers as name/value pairs
pub type Headers = [(&'static str, String)];

/// Generic HTTP client trait - users can implement their own
///
/// Implementations return `Ok` for every response they receive, including
/// error statuses, and `Err` only when the exchange itself failed.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET the URL, return status and response bytes
    async fn get(&self, url: &str, headers: &Headers) -> Result<HttpResponse, HttpError>;

    /// POST JSON data to URL, return status and response bytes
    async fn post_json(
        &self,
        url: &str,
        headers: &Headers,
        body: Vec<u8>,
    ) -> Result<HttpResponse, HttpError>;
}

#[cfg(feature = "reqwest")]
pub mod reqwest;

#[cfg(feature = "reqwest")]
pub use self::reqwest::ReqwestClient;

#[cfg(test)]
pub(crate) mod mock;
