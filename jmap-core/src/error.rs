// jmap-core/src/error.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every failure the client core can surface.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure, unexpected HTTP status, or a body that is not the
    /// expected JSON envelope.
    #[error("{}", display_network(.status, .message))]
    Network {
        status: Option<u16>,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// HTTP 401 from the session or API endpoint.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The session endpoint answered 200 with a body that is not a Session.
    #[error("session error: {0}")]
    Session(String),

    /// A server-reported (or locally synthesized) per-call failure.
    #[error(transparent)]
    Method(#[from] MethodError),

    #[error("configuration error: {0}")]
    Configuration(String),
}

fn display_network(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("network error (HTTP {}): {}", status, message),
        None => format!("network error: {}", message),
    }
}

impl Error {
    pub(crate) fn network_status(status: u16, message: impl Into<String>) -> Self {
        Error::Network {
            status: Some(status),
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn network_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Network {
            status: None,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// HTTP status attached to a network error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Network { status, .. } => *status,
            Error::Authentication(_) => Some(401),
            _ => None,
        }
    }

    /// Call id of the invocation that failed, for method errors.
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Error::Method(err) => Some(&err.call_id),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network { .. })
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication(_))
    }

    pub fn is_session(&self) -> bool {
        matches!(self, Error::Session(_))
    }

    pub fn is_method(&self) -> bool {
        matches!(self, Error::Method(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

impl From<crate::http::HttpError> for Error {
    fn from(e: crate::http::HttpError) -> Self {
        Error::Network {
            status: e.status,
            message: match e.status {
                Some(_) => "failed to read response body".to_string(),
                None => "transport failure".to_string(),
            },
            source: Some(Box::new(e)),
        }
    }
}

/// Method-level error types (RFC 8620 Section 3.6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MethodErrorType {
    ServerUnavailable,
    ServerFail,
    ServerPartialFail,
    UnknownMethod,
    InvalidArguments,
    InvalidResultReference,
    Forbidden,
    AccountNotFound,
    AccountNotSupportedByMethod,
    AccountReadOnly,
    RequestTooLarge,
    CannotCalculateChanges,
    StateMismatch,
    AnchorNotFound,
    UnsupportedSort,
    UnsupportedFilter,
    TooManyChanges,
    FromAccountNotFound,
    FromAccountNotSupportedByMethod,
    RateLimit,
    /// No response matched the requested method name and call id.
    NotFound,
    /// A type string this crate does not know.
    #[serde(other)]
    Unknown,
}

impl MethodErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodErrorType::ServerUnavailable => "serverUnavailable",
            MethodErrorType::ServerFail => "serverFail",
            MethodErrorType::ServerPartialFail => "serverPartialFail",
            MethodErrorType::UnknownMethod => "unknownMethod",
            MethodErrorType::InvalidArguments => "invalidArguments",
            MethodErrorType::InvalidResultReference => "invalidResultReference",
            MethodErrorType::Forbidden => "forbidden",
            MethodErrorType::AccountNotFound => "accountNotFound",
            MethodErrorType::AccountNotSupportedByMethod => "accountNotSupportedByMethod",
            MethodErrorType::AccountReadOnly => "accountReadOnly",
            MethodErrorType::RequestTooLarge => "requestTooLarge",
            MethodErrorType::CannotCalculateChanges => "cannotCalculateChanges",
            MethodErrorType::StateMismatch => "stateMismatch",
            MethodErrorType::AnchorNotFound => "anchorNotFound",
            MethodErrorType::UnsupportedSort => "unsupportedSort",
            MethodErrorType::UnsupportedFilter => "unsupportedFilter",
            MethodErrorType::TooManyChanges => "tooManyChanges",
            MethodErrorType::FromAccountNotFound => "fromAccountNotFound",
            MethodErrorType::FromAccountNotSupportedByMethod => "fromAccountNotSupportedByMethod",
            MethodErrorType::RateLimit => "rateLimit",
            MethodErrorType::NotFound => "notFound",
            MethodErrorType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for MethodErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one specific method call.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "JMAP method error {error_type} (call {call_id}){}",
    display_description(.description)
)]
pub struct MethodError {
    pub error_type: MethodErrorType,
    pub description: Option<String>,
    pub details: Option<serde_json::Value>,
    pub call_id: String,
}

fn display_description(description: &Option<String>) -> String {
    description
        .as_ref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

/// Wire shape of the arguments of an `"error"` response invocation.
#[derive(Debug, Deserialize)]
struct MethodErrorArguments {
    #[serde(rename = "type")]
    type_: MethodErrorType,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

impl MethodError {
    pub fn new(error_type: MethodErrorType, call_id: impl Into<String>) -> Self {
        Self {
            error_type,
            description: None,
            details: None,
            call_id: call_id.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Interpret the arguments of an `"error"` response invocation.
    ///
    /// Arguments without a usable `type` still yield an error for the call,
    /// reported as `serverFail` with the raw payload kept in `details`.
    pub fn from_arguments(arguments: &serde_json::Value, call_id: &str) -> Self {
        match serde_json::from_value::<MethodErrorArguments>(arguments.clone()) {
            Ok(args) => Self {
                error_type: args.type_,
                description: args.description,
                details: args.details,
                call_id: call_id.to_string(),
            },
            Err(e) => Self::new(MethodErrorType::ServerFail, call_id)
                .with_description(format!("malformed error response: {}", e))
                .with_details(arguments.clone()),
        }
    }
}
