//! Downstream HTTP collaborator.
//!
//! Thin CRUD surface over reqwest shared by the builtin tool handlers.
//! Every call goes through the retry policy; non-2xx statuses surface as
//! classified `REQUEST_ERROR` failures carrying the status, which is what
//! the policy keys its retry decision on.

use crate::downstream::retry::{with_retry, RetryPolicy};
use crate::utils::errors::{BridgeError, BridgeResult};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub basic_auth: Option<(String, String)>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".into(),
            bearer_token: None,
            basic_auth: None,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub data: Value,
    pub status: u16,
    pub headers: HashMap<String, String>,
}

pub struct HttpClient {
    client: Client,
    base_url: Url,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> BridgeResult<Self> {
        let base_url = config
            .base_url
            .parse::<Url>()
            .map_err(|e| BridgeError::ConfigError(format!("invalid base url: {}", e)))?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    pub async fn get(&self, path: &str) -> BridgeResult<HttpResponse> {
        self.execute(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> BridgeResult<HttpResponse> {
        self.execute(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> BridgeResult<HttpResponse> {
        self.execute(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> BridgeResult<HttpResponse> {
        self.execute(Method::DELETE, path, None).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> BridgeResult<HttpResponse> {
        with_retry(&self.config.retry, || {
            self.send_once(method.clone(), path, body.as_ref())
        })
        .await
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> BridgeResult<HttpResponse> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| BridgeError::ValidationError(format!("invalid path '{}': {}", path, e)))?;
        debug!(%method, %url, "downstream request");

        let mut request = self.client.request(method, url);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some((user, password)) = &self.config.basic_auth {
            request = request.basic_auth(user, Some(password));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BridgeError::TransportError(format!("downstream request failed: {}", e)))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let text = response
            .text()
            .await
            .map_err(|e| BridgeError::TransportError(format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(BridgeError::RequestError {
                status: status.as_u16(),
                message: summarize_failure(status, &text),
            });
        }

        let data = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };

        Ok(HttpResponse {
            data,
            status: status.as_u16(),
            headers,
        })
    }
}

fn summarize_failure(status: StatusCode, body: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("unknown status");
    let body = body.trim();
    if body.is_empty() {
        reason.to_string()
    } else {
        // Bodies can be large HTML error pages; keep diagnostics short.
        let snippet: String = body.chars().take(200).collect();
        format!("{}: {}", reason, snippet)
    }
}
