// jmap-core/src/session.rs
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::retry::RetryPolicy;
use crate::types::Session;
use log::{debug, trace};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// A fetched session and when it was fetched.
#[derive(Debug, Clone)]
struct SessionState {
    session: Arc<Session>,
    last_updated: Instant,
}

/// Lazily fetched, time-bounded JMAP session.
///
/// The cache is the only writer of its entry. Readers get an `Arc<Session>`
/// snapshot; a refresh swaps the whole entry and never edits it in place.
pub struct SessionCache<C> {
    http: Arc<C>,
    session_url: String,
    headers: Vec<(&'static str, String)>,
    retry: RetryPolicy,
    ttl: Duration,
    log_requests: bool,
    state: RwLock<Option<SessionState>>,
    // Serializes fetches so concurrent misses hit the network once.
    refresh_gate: tokio::sync::Mutex<()>,
}

impl<C: HttpClient> SessionCache<C> {
    pub fn new(http: Arc<C>, config: &ClientConfig) -> Self {
        Self {
            http,
            session_url: config.session_url.clone(),
            headers: config.request_headers(),
            retry: RetryPolicy::new(config.max_retries, config.retry_base_delay()),
            ttl: config.session_ttl(),
            log_requests: config.log_requests,
            state: RwLock::new(None),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Cached session if fresh, otherwise fetch and cache a new one.
    pub async fn get_session(&self) -> Result<Arc<Session>> {
        if let Some(session) = self.fresh() {
            trace!("using cached session {}", session.state);
            return Ok(session);
        }

        let _gate = self.refresh_gate.lock().await;
        // Another caller may have fetched while we waited.
        if let Some(session) = self.fresh() {
            return Ok(session);
        }
        self.fetch_and_store().await
    }

    /// Current session state token.
    pub async fn get_session_state(&self) -> Result<String> {
        Ok(self.get_session().await?.state.clone())
    }

    /// Fetch a new session regardless of the cached one.
    pub async fn refresh(&self) -> Result<Arc<Session>> {
        let _gate = self.refresh_gate.lock().await;
        self.fetch_and_store().await
    }

    /// Drop the cached session; the next `get_session` fetches.
    pub fn invalidate(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.take().is_some() {
            debug!("session invalidated");
        }
    }

    /// Whether a fresh session is cached.
    pub fn is_cached(&self) -> bool {
        self.fresh().is_some()
    }

    fn fresh(&self) -> Option<Arc<Session>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .as_ref()
            .filter(|s| s.last_updated.elapsed() < self.ttl)
            .map(|s| s.session.clone())
    }

    async fn fetch_and_store(&self) -> Result<Arc<Session>> {
        let session = Arc::new(self.fetch().await?);
        debug!(
            "fetched session {} (api {})",
            session.state, session.api_url
        );

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = Some(SessionState {
            session: session.clone(),
            last_updated: Instant::now(),
        });
        Ok(session)
    }

    async fn fetch(&self) -> Result<Session> {
        debug!("fetching session from {}", self.session_url);
        let resp = match self
            .retry
            .run(|| self.http.get(&self.session_url, &self.headers))
            .await
        {
            Ok(resp) => resp,
            Err(e) if e.status == Some(401) => return Err(self.unauthorized()),
            Err(e) => return Err(e.into()),
        };

        if self.log_requests {
            debug!(
                "session response {}: {}",
                resp.status,
                String::from_utf8_lossy(&resp.body)
            );
        }

        match resp.status {
            200 => {}
            401 => return Err(self.unauthorized()),
            status => {
                return Err(Error::network_status(
                    status,
                    format!("session request failed: {}", String::from_utf8_lossy(&resp.body)),
                ));
            }
        }

        let value: serde_json::Value = serde_json::from_slice(&resp.body)
            .map_err(|e| Error::network_source("invalid JSON in session response", e))?;
        serde_json::from_value(value)
            .map_err(|e| Error::Session(format!("invalid format: {}", e)))
    }

    fn unauthorized(&self) -> Error {
        self.invalidate();
        Error::Authentication(format!(
            "session endpoint {} rejected the token",
            self.session_url
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::{session_json, Method, MockHttp};
    use crate::http::{HttpError, HttpResponse};
    use serde_json::json;

    const SESSION_URL: &str = "https://jmap.example.com/.well-known/jmap";
    const API_URL: &str = "https://jmap.example.com/api/";

    fn cache(http: MockHttp) -> SessionCache<MockHttp> {
        let config = ClientConfig::new(SESSION_URL, "secret-token")
            .with_user_agent("jmap-core-tests/1.0");
        SessionCache::new(Arc::new(http), &config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_once_within_ttl() {
        let http = MockHttp::new();
        http.push_json(200, session_json(API_URL, "s1"))
            .push_json(200, session_json(API_URL, "s2"));
        let cache = cache(http);

        let first = cache.get_session().await.unwrap();
        let second = cache.get_session().await.unwrap();
        assert_eq!(first.state, "s1");
        assert_eq!(second.state, "s1");
        assert_eq!(cache.http.count(Method::Get), 1);

        tokio::time::advance(Duration::from_secs(301)).await;

        let third = cache.get_session().await.unwrap();
        assert_eq!(third.state, "s2");
        assert_eq!(cache.http.count(Method::Get), 2);
    }

    #[tokio::test]
    async fn test_sends_auth_and_fixed_headers() {
        let http = MockHttp::new();
        http.push_json(200, session_json(API_URL, "s1"));
        let cache = cache(http);

        cache.get_session().await.unwrap();

        let requests = cache.http.requests();
        assert_eq!(requests[0].url, SESSION_URL);
        assert_eq!(requests[0].header("authorization"), Some("Bearer secret-token"));
        assert_eq!(requests[0].header("content-type"), Some("application/json"));
        assert_eq!(requests[0].header("user-agent"), Some("jmap-core-tests/1.0"));
    }

    #[tokio::test]
    async fn test_unauthorized_fails_without_retry_or_caching() {
        let http = MockHttp::new();
        http.push(Ok(HttpResponse::new(401, "Unauthorized")));
        let cache = cache(http);

        let err = cache.get_session().await.unwrap_err();
        assert!(err.is_authentication());
        assert!(!cache.is_cached());
        assert_eq!(cache.http.count(Method::Get), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_body_read_failure_is_authentication_error() {
        let http = MockHttp::new();
        http.push(Err(HttpError {
            status: Some(401),
            message: "connection reset".to_string(),
        }));
        let cache = cache(http);

        let err = cache.get_session().await.unwrap_err();
        assert!(err.is_authentication(), "unexpected error: {}", err);
        assert!(!cache.is_cached());
        assert_eq!(cache.http.count(Method::Get), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_network_error() {
        let http = MockHttp::new();
        http.push(Ok(HttpResponse::new(503, "maintenance")));
        let cache = cache(http);

        let err = cache.get_session().await.unwrap_err();
        assert!(err.is_network());
        assert_eq!(err.status(), Some(503));
        assert_eq!(cache.http.count(Method::Get), 1);
    }

    #[tokio::test]
    async fn test_invalid_json_is_network_error() {
        let http = MockHttp::new();
        http.push(Ok(HttpResponse::new(200, "<html>not json</html>")));
        let cache = cache(http);

        let err = cache.get_session().await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_wrong_shape_is_session_error() {
        let mut body = session_json(API_URL, "s1");
        body.as_object_mut().unwrap().remove("apiUrl");

        let http = MockHttp::new();
        http.push_json(200, body);
        let cache = cache(http);

        let err = cache.get_session().await.unwrap_err();
        assert!(err.is_session(), "unexpected error: {}", err);
        assert!(!cache.is_cached());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_are_retried() {
        let http = MockHttp::new();
        http.push_transport_error("connection refused")
            .push_transport_error("connection reset")
            .push_json(200, session_json(API_URL, "s1"));
        let cache = cache(http);

        let session = cache.get_session().await.unwrap();
        assert_eq!(session.state, "s1");
        assert_eq!(cache.http.count(Method::Get), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_exhaust_retries() {
        let http = MockHttp::new();
        for _ in 0..4 {
            http.push_transport_error("dns failure");
        }
        let cache = cache(http);

        let err = cache.get_session().await.unwrap_err();
        assert!(err.is_network());
        assert_eq!(err.status(), None);
        assert_eq!(cache.http.count(Method::Get), 4);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let http = MockHttp::new();
        http.push_json(200, session_json(API_URL, "s1"))
            .push_json(200, session_json(API_URL, "s2"));
        let cache = cache(http);

        assert_eq!(cache.get_session_state().await.unwrap(), "s1");
        cache.invalidate();
        assert!(!cache.is_cached());
        assert_eq!(cache.get_session_state().await.unwrap(), "s2");
        assert_eq!(cache.http.count(Method::Get), 2);
    }

    #[tokio::test]
    async fn test_refresh_replaces_entry() {
        let http = MockHttp::new();
        http.push_json(200, session_json(API_URL, "s1"))
            .push_json(200, session_json("https://other.example.com/api/", "s2"));
        let cache = cache(http);

        let before = cache.get_session().await.unwrap();
        let after = cache.refresh().await.unwrap();
        assert_eq!(before.api_url, API_URL);
        assert_eq!(after.api_url, "https://other.example.com/api/");
        assert_eq!(cache.get_session().await.unwrap().state, "s2");
    }

    #[tokio::test]
    async fn test_concurrent_misses_fetch_once() {
        let http = MockHttp::new();
        http.push_json(200, session_json(API_URL, "s1"));
        let cache = cache(http);

        let (a, b) = tokio::join!(cache.get_session(), cache.get_session());
        assert_eq!(a.unwrap().state, "s1");
        assert_eq!(b.unwrap().state, "s1");
        assert_eq!(cache.http.count(Method::Get), 1);
    }

    #[tokio::test]
    async fn test_extra_session_fields_are_ignored() {
        let mut body = session_json(API_URL, "s1");
        body["vendorExtension"] = json!({"x": 1});

        let http = MockHttp::new();
        http.push_json(200, body);
        let cache = cache(http);

        assert!(cache.get_session().await.is_ok());
    }
}
