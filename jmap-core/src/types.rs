// jmap-core/src/types.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Capability URNs used in `using` and in the session capability maps.
pub mod capability {
    pub const CORE: &str = "urn:ietf:params:jmap:core";
    pub const MAIL: &str = "urn:ietf:params:jmap:mail";
    pub const SUBMISSION: &str = "urn:ietf:params:jmap:submission";
    pub const VACATION_RESPONSE: &str = "urn:ietf:params:jmap:vacationresponse";

    /// Capabilities sent when a batch names none.
    pub const DEFAULT_USING: &[&str] = &[CORE, MAIL];
}

/// JMAP Session resource (RFC 8620 Section 2)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    /// Server capabilities keyed by URN
    pub capabilities: HashMap<String, Value>,
    /// The accounts available to the user
    pub accounts: HashMap<String, AccountData>,
    #[serde(rename = "primaryAccounts")]
    #[serde(default)]
    pub primary_accounts: HashMap<String, String>,
    #[serde(default)]
    pub username: String,
    /// The URL to use for JMAP API requests
    #[serde(rename = "apiUrl")]
    pub api_url: String,
    /// Download URL template for binary data
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
    /// Upload URL template for files
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
    /// Event source URL template for push notifications
    #[serde(rename = "eventSourceUrl")]
    pub event_source_url: String,
    /// Opaque token that changes whenever any session property changes
    pub state: String,
}

impl Session {
    pub fn has_capability(&self, urn: &str) -> bool {
        self.capabilities.contains_key(urn)
    }

    /// Decoded `urn:ietf:params:jmap:core` limits, if advertised.
    pub fn core_capability(&self) -> Option<CoreCapability> {
        self.capabilities
            .get(capability::CORE)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn primary_account_id(&self, capability: &str) -> Option<&str> {
        self.primary_accounts.get(capability).map(String::as_str)
    }

    /// The primary mail account, else the first personal account, else any.
    pub fn default_account_id(&self) -> Option<&str> {
        if let Some(id) = self.primary_account_id(capability::MAIL) {
            return Some(id);
        }

        let mut ids: Vec<&String> = self.accounts.keys().collect();
        ids.sort();

        ids.iter()
            .copied()
            .find(|id| {
                self.accounts
                    .get(id.as_str())
                    .and_then(|data| data.is_personal)
                    .unwrap_or(false)
            })
            .or_else(|| ids.first().copied())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountData {
    pub name: Option<String>,
    #[serde(rename = "isPersonal")]
    pub is_personal: Option<bool>,
    #[serde(rename = "isReadOnly")]
    pub is_read_only: Option<bool>,
    #[serde(rename = "accountCapabilities")]
    pub account_capabilities: Option<HashMap<String, Value>>,
}

/// Server limits from the core capability (RFC 8620 Section 2)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoreCapability {
    #[serde(rename = "maxSizeUpload")]
    pub max_size_upload: u64,
    #[serde(rename = "maxConcurrentUpload")]
    pub max_concurrent_upload: u64,
    #[serde(rename = "maxSizeRequest")]
    pub max_size_request: u64,
    #[serde(rename = "maxConcurrentRequests")]
    pub max_concurrent_requests: u64,
    #[serde(rename = "maxCallsInRequest")]
    pub max_calls_in_request: u64,
    #[serde(rename = "maxObjectsInGet")]
    pub max_objects_in_get: u64,
    #[serde(rename = "maxObjectsInSet")]
    pub max_objects_in_set: u64,
    #[serde(rename = "collationAlgorithms")]
    #[serde(default)]
    pub collation_algorithms: Vec<String>,
}

/// One method call or method response: `[name, arguments, callId]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(String, Value, String)", into = "(String, Value, String)")]
pub struct Invocation {
    pub name: String,
    pub arguments: Value,
    pub call_id: String,
}

impl Invocation {
    /// Method name the server uses for a failed call.
    pub const ERROR: &'static str = "error";

    pub fn new(name: impl Into<String>, arguments: Value, call_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments,
            call_id: call_id.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.name == Self::ERROR
    }
}

impl From<(String, Value, String)> for Invocation {
    fn from((name, arguments, call_id): (String, Value, String)) -> Self {
        Self {
            name,
            arguments,
            call_id,
        }
    }
}

impl From<Invocation> for (String, Value, String) {
    fn from(invocation: Invocation) -> Self {
        (invocation.name, invocation.arguments, invocation.call_id)
    }
}

/// JMAP request envelope (RFC 8620 Section 3.3)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub using: Vec<String>,
    #[serde(rename = "methodCalls")]
    pub method_calls: Vec<Invocation>,
    #[serde(rename = "createdIds")]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub created_ids: Option<HashMap<String, String>>,
}

impl Request {
    pub fn new<S: Into<String>>(using: impl IntoIterator<Item = S>) -> Self {
        Self {
            using: using.into_iter().map(Into::into).collect(),
            method_calls: Vec::new(),
            created_ids: None,
        }
    }

    /// Append a method call
    pub fn call(
        mut self,
        name: impl Into<String>,
        arguments: Value,
        call_id: impl Into<String>,
    ) -> Self {
        self.method_calls
            .push(Invocation::new(name, arguments, call_id));
        self
    }

    pub fn with_created_ids(mut self, created_ids: HashMap<String, String>) -> Self {
        self.created_ids = Some(created_ids);
        self
    }
}

/// JMAP response envelope (RFC 8620 Section 3.4)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    #[serde(rename = "methodResponses")]
    pub method_responses: Vec<Invocation>,
    #[serde(rename = "createdIds")]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub created_ids: Option<HashMap<String, String>>,
    #[serde(rename = "sessionState")]
    pub session_state: String,
}

impl Response {
    /// First response invocation matching both method name and call id.
    pub fn method_response(&self, name: &str, call_id: &str) -> Option<&Invocation> {
        self.method_responses
            .iter()
            .find(|inv| inv.name == name && inv.call_id == call_id)
    }

    /// First `"error"` invocation, if the server reported any.
    pub fn first_error(&self) -> Option<&Invocation> {
        self.method_responses.iter().find(|inv| inv.is_error())
    }
}

/// Back-reference to an earlier call's result (RFC 8620 Section 3.7).
///
/// Sent as the value of a `#`-prefixed argument; resolved by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultReference {
    #[serde(rename = "resultOf")]
    pub result_of: String,
    pub name: String,
    pub path: String,
}

impl ResultReference {
    pub fn new(
        result_of: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            result_of: result_of.into(),
            name: name.into(),
            path: path.into(),
        }
    }
}
