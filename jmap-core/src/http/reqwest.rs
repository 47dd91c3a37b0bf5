// jmap-core/src/http/reqwest.rs
use super::{Headers, HttpClient, HttpError, HttpResponse};
use async_trait::async_trait;
use std::time::Duration;

pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
        }
    }

    /// Client whose every request fails after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::new(e.to_string()))?;
        Ok(Self { inner })
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<HttpResponse, HttpError> {
        let resp = req.send().await.map_err(transport_error)?;

        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| HttpError {
                status: Some(status),
                message: e.to_string(),
            })?
            .to_vec();

        Ok(HttpResponse { status, body })
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

fn transport_error(e: reqwest::Error) -> HttpError {
    let message = if e.is_timeout() {
        format!("request timed out: {}", e)
    } else {
        e.to_string()
    };
    HttpError {
        status: None,
        message,
    }
}

fn apply_headers(mut req: reqwest::RequestBuilder, headers: &Headers) -> reqwest::RequestBuilder {
    for (name, value) in headers {
        req = req.header(*name, value.as_str());
    }
    req
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<HttpResponse, HttpError> {
        let req = apply_headers(self.inner.get(url), headers);
        self.send(req).await
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &Headers,
        body: Vec<u8>,
    ) -> Result<HttpResponse, HttpError> {
        let req = apply_headers(self.inner.post(url), headers).body(body);
        self.send(req).await
    }
}
