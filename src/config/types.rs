use crate::client::connection::ReconnectBackoff;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub downstream: DownstreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub reconnect_interval_ms: u64,
    pub max_reconnect_attempts: u32,
    pub backoff: ReconnectBackoff,
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:4000".to_string(),
            reconnect_interval_ms: 5000,
            max_reconnect_attempts: 5,
            backoff: ReconnectBackoff::Fixed,
            request_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DownstreamConfig {
    #[serde(default)]
    pub issues: ServiceConfig,
    #[serde(default)]
    pub wiki: ServiceConfig,
}

/// One downstream REST service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            bearer_token: None,
            username: None,
            password: None,
            timeout_ms: 30_000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl ServiceConfig {
    pub fn http_config(&self) -> crate::downstream::HttpClientConfig {
        use std::time::Duration;

        let basic_auth = match (&self.username, &self.password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        };

        crate::downstream::HttpClientConfig {
            base_url: self.base_url.clone(),
            bearer_token: self.bearer_token.clone(),
            basic_auth,
            timeout: Duration::from_millis(self.timeout_ms),
            retry: crate::downstream::RetryPolicy {
                max_retries: self.max_retries,
                retry_delay: Duration::from_millis(self.retry_delay_ms),
                ..Default::default()
            },
        }
    }
}

impl ClientConfig {
    pub fn client_options(&self) -> crate::client::ClientOptions {
        use std::time::Duration;

        crate::client::ClientOptions {
            server_url: self.server_url.clone(),
            reconnect_interval: Duration::from_millis(self.reconnect_interval_ms),
            max_reconnect_attempts: self.max_reconnect_attempts,
            backoff: self.backoff,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}
