// jmap-core/src/http/mock.rs
use super::{Headers, HttpClient, HttpError, HttpResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

type Outcome = Result<HttpResponse, HttpError>;

/// Replays queued outcomes in order and records every request.
///
/// A request is recorded before its outcome is awaited, so a delayed outcome
/// still shows up in `requests()`.
#[derive(Default)]
pub(crate) struct MockHttp {
    script: Mutex<VecDeque<(Option<Duration>, Outcome)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, outcome: Outcome) -> &Self {
        self.script.lock().unwrap().push_back((None, outcome));
        self
    }

    /// Queue an outcome that is only delivered after `delay`.
    pub fn push_delayed(&self, delay: Duration, outcome: Outcome) -> &Self {
        self.script.lock().unwrap().push_back((Some(delay), outcome));
        self
    }

    pub fn push_json(&self, status: u16, body: serde_json::Value) -> &Self {
        self.push(Ok(HttpResponse::new(status, body.to_string())))
    }

    pub fn push_transport_error(&self, message: &str) -> &Self {
        self.push(Err(HttpError::new(message)))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    fn record(&self, method: Method, url: &str, headers: &Headers, body: Vec<u8>) {
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(n, v)| (n.to_string(), v.clone()))
                .collect(),
            body,
        });
    }

    async fn next(&self) -> Outcome {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some((Some(delay), outcome)) => {
                tokio::time::sleep(delay).await;
                outcome
            }
            Some((None, outcome)) => outcome,
            None => Err(HttpError::new("mock script exhausted")),
        }
    }
}

#[async_trait]
impl HttpClient for MockHttp {
    async fn get(&self, url: &str, headers: &Headers) -> Result<HttpResponse, HttpError> {
        self.record(Method::Get, url, headers, Vec::new());
        self.next().await
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &Headers,
        body: Vec<u8>,
    ) -> Result<HttpResponse, HttpError> {
        self.record(Method::Post, url, headers, body);
        self.next().await
    }
}

pub(crate) fn session_json(api_url: &str, state: &str) -> serde_json::Value {
    serde_json::json!({
        "capabilities": {"urn:ietf:params:jmap:core": {}, "urn:ietf:params:jmap:mail": {}},
        "accounts": {"A": {"name": "me", "isPersonal": true, "isReadOnly": false}},
        "primaryAccounts": {"urn:ietf:params:jmap:mail": "A"},
        "username": "me@example.com",
        "apiUrl": api_url,
        "downloadUrl": "https://jmap.example.com/download/{accountId}/{blobId}/{name}",
        "uploadUrl": "https://jmap.example.com/upload/{accountId}/",
        "eventSourceUrl": "https://jmap.example.com/events/",
        "state": state
    })
}
