// jmap-core/src/client.rs
use crate::config::ClientConfig;
use crate::error::{Error, MethodError, Result};
use crate::extract::extract_value;
use crate::http::HttpClient;
use crate::retry::RetryPolicy;
use crate::session::SessionCache;
use crate::types::{capability, Invocation, Request, Response, Session};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Batches method calls into HTTP exchanges against the session's API URL.
pub struct JmapClient<C: HttpClient> {
    http: Arc<C>,
    sessions: SessionCache<C>,
    headers: Vec<(&'static str, String)>,
    retry: RetryPolicy,
    max_batch_size: usize,
    log_requests: bool,
}

#[cfg(feature = "reqwest")]
impl JmapClient<crate::http::ReqwestClient> {
    /// Client over reqwest with the configured per-request timeout
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = crate::http::ReqwestClient::with_timeout(config.timeout())
            .map_err(|e| Error::Configuration(format!("cannot build HTTP client: {}", e)))?;
        Self::new(http, config)
    }
}

impl<C: HttpClient> JmapClient<C> {
    pub fn new(http: C, config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let http = Arc::new(http);
        Ok(Self {
            sessions: SessionCache::new(http.clone(), &config),
            http,
            headers: config.request_headers(),
            retry: RetryPolicy::new(config.max_retries, config.retry_base_delay()),
            max_batch_size: config.max_batch_size,
            log_requests: config.log_requests,
        })
    }

    pub fn http(&self) -> &C {
        &self.http
    }

    pub fn session_cache(&self) -> &SessionCache<C> {
        &self.sessions
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub async fn session(&self) -> Result<Arc<Session>> {
        self.sessions.get_session().await
    }

    pub async fn session_state(&self) -> Result<String> {
        self.sessions.get_session_state().await
    }

    pub fn invalidate_session(&self) {
        self.sessions.invalidate()
    }

    /// Send `method_calls` and return the server's response.
    ///
    /// Up to `max_batch_size` calls go out in one exchange. Longer lists are
    /// split into contiguous chunks sent one after another; their responses
    /// are concatenated in order and the last chunk's `sessionState` wins.
    /// The first failing chunk aborts the batch, including any `"error"`
    /// response invocation. `using` defaults to core + mail.
    pub async fn batch(
        &self,
        method_calls: Vec<Invocation>,
        using: Option<&[&str]>,
    ) -> Result<Response> {
        let using: Vec<String> = using
            .unwrap_or(capability::DEFAULT_USING)
            .iter()
            .map(|s| s.to_string())
            .collect();

        if method_calls.len() <= self.max_batch_size {
            let request = Request {
                using,
                method_calls,
                created_ids: None,
            };
            return self.send(&request).await;
        }

        let total = method_calls.len();
        debug!(
            "splitting {} method calls into {} requests of at most {}",
            total,
            total.div_ceil(self.max_batch_size),
            self.max_batch_size
        );

        let mut method_responses = Vec::with_capacity(total);
        let mut created_ids: Option<HashMap<String, String>> = None;
        let mut session_state = String::new();

        let mut remaining = method_calls.into_iter().peekable();
        while remaining.peek().is_some() {
            let request = Request {
                using: using.clone(),
                method_calls: remaining.by_ref().take(self.max_batch_size).collect(),
                created_ids: None,
            };
            let response = self.send(&request).await?;

            method_responses.extend(response.method_responses);
            if let Some(ids) = response.created_ids {
                created_ids.get_or_insert_with(HashMap::new).extend(ids);
            }
            session_state = response.session_state;
        }

        Ok(Response {
            method_responses,
            created_ids,
            session_state,
        })
    }

    /// One exchange with `request`, decoding the whole envelope as `T`.
    ///
    /// No chunking and no scan for `"error"` invocations.
    pub async fn request<T: DeserializeOwned>(&self, request: &Request) -> Result<T> {
        let value = self.exchange(request).await?;
        serde_json::from_value(value)
            .map_err(|e| Error::network_source("invalid response format", e))
    }

    /// Single method call with call id `"0"`, returning its raw arguments.
    pub async fn call_method(
        &self,
        using: &[&str],
        method: &str,
        arguments: Value,
    ) -> Result<Value> {
        let response = self
            .batch(vec![Invocation::new(method, arguments, "0")], Some(using))
            .await?;
        extract_value(&response, method, "0").cloned()
    }

    /// Exchange plus envelope validation and the `"error"` scan.
    async fn send(&self, request: &Request) -> Result<Response> {
        let value = self.exchange(request).await?;
        let response: Response = serde_json::from_value(value)
            .map_err(|e| Error::network_source("invalid response format", e))?;

        if let Some(failed) = response.first_error() {
            debug!("method call {} failed", failed.call_id);
            return Err(MethodError::from_arguments(&failed.arguments, &failed.call_id).into());
        }
        Ok(response)
    }

    async fn exchange(&self, request: &Request) -> Result<Value> {
        let session = self.sessions.get_session().await?;
        let body = serde_json::to_vec(request)
            .map_err(|e| Error::network_source("cannot encode request", e))?;

        if self.log_requests {
            debug!("POST {}: {}", session.api_url, String::from_utf8_lossy(&body));
        }

        let resp = match self
            .retry
            .run(|| self.http.post_json(&session.api_url, &self.headers, body.clone()))
            .await
        {
            Ok(resp) => resp,
            Err(e) if e.status == Some(401) => return Err(self.unauthorized(&session.api_url)),
            Err(e) => return Err(e.into()),
        };

        if self.log_requests {
            debug!(
                "response {}: {}",
                resp.status,
                String::from_utf8_lossy(&resp.body)
            );
        }

        match resp.status {
            200 => {}
            401 => return Err(self.unauthorized(&session.api_url)),
            status => {
                return Err(Error::network_status(
                    status,
                    format!("API request failed: {}", String::from_utf8_lossy(&resp.body)),
                ));
            }
        }

        serde_json::from_slice(&resp.body)
            .map_err(|e| Error::network_source("invalid JSON in API response", e))
    }

    /// A rejected token also discards the session it was used with.
    fn unauthorized(&self, api_url: &str) -> Error {
        self.sessions.invalidate();
        Error::Authentication(format!("API endpoint {} rejected the token", api_url))
    }
}
