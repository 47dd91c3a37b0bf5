// jmap-core/src/lib.rs
//! Request batching and session management for JMAP (RFC 8620 / RFC 8621).
//!
//! [`JmapClient::batch`] sends method calls through a cached [`Session`],
//! splitting long lists into sequential chunks, and [`extract()`] correlates a
//! method name and call id back to a typed result.

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod retry;
pub mod session;
pub mod types;

pub use client::JmapClient;
pub use config::ClientConfig;
pub use error::{Error, MethodError, MethodErrorType, Result};
pub use extract::{extract, extract_value};
pub use http::{HttpClient, HttpError, HttpResponse};
pub use retry::RetryPolicy;
pub use session::SessionCache;
pub use types::{
    capability, AccountData, CoreCapability, Invocation, Request, Response, ResultReference,
    Session,
};

// Re-export reqwest client when feature is enabled
#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
