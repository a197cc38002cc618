//! HTTP client for the proxy daemon's REST/streaming API.
//!
//! One-shot calls (config, version, connection control) are plain
//! request/response; the log and connection endpoints return the raw byte
//! stream of a long-lived chunked response, which the streaming session feeds
//! through a decoder. Filter parameters travel in the query string, so a
//! filter change always means a reconnect.

use bytes::Bytes;
use futures_util::stream::Stream;
use futures_util::StreamExt;
use reqwest::Client;
use std::pin::Pin;
use std::time::Duration;

use crate::models::{ConfigSnapshot, LogLevel, Version};

/// How long a connection attempt may remain in flight before it is failed.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw bytes of one streaming response.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, DaemonError>> + Send>>;

/// Error type for daemon API operations.
#[derive(Debug)]
pub enum DaemonError {
    /// HTTP transport failed
    Http(reqwest::Error),
    /// Request or connection attempt timed out
    Timeout(String),
    /// Server returned an error status
    ServerError { status: u16, message: String },
    /// Config PATCH/PUT rejected by the daemon
    ConfigRejected { status: u16, message: String },
}

impl std::fmt::Display for DaemonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DaemonError::Http(e) => write!(f, "HTTP error: {}", e),
            DaemonError::Timeout(what) => write!(f, "Timed out: {}", what),
            DaemonError::ServerError { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            DaemonError::ConfigRejected { status, message } => {
                write!(f, "Config rejected ({}): {}", status, message)
            }
        }
    }
}

impl std::error::Error for DaemonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DaemonError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DaemonError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DaemonError::Timeout(e.to_string())
        } else {
            DaemonError::Http(e)
        }
    }
}

/// Client for one daemon's API endpoint.
#[derive(Clone)]
pub struct DaemonClient {
    /// Base URL, e.g. `http://127.0.0.1:9090`
    pub base_url: String,
    /// Optional API secret, sent as a bearer token
    secret: Option<String>,
    client: Client,
}

impl DaemonClient {
    pub fn new(base_url: impl Into<String>, secret: Option<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        DaemonClient {
            base_url: base_url.into(),
            secret,
            client,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(secret) = &self.secret {
            builder = builder.bearer_auth(secret);
        }
        builder
    }

    /// Fetch the daemon's general configuration.
    pub async fn fetch_config(&self) -> Result<ConfigSnapshot, DaemonError> {
        let response = self.request(reqwest::Method::GET, "/configs").send().await?;
        if !response.status().is_success() {
            return Err(server_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// PATCH a partial config. Non-2xx becomes `ConfigRejected`.
    ///
    /// The payload goes through [`patch_compat`] first, mirroring `socks-port`
    /// under the deprecated `socket-port` name for daemons predating the field
    /// rename.
    pub async fn patch_config(&self, partial: serde_json::Value) -> Result<(), DaemonError> {
        let body = patch_compat(partial);
        let response = self
            .request(reqwest::Method::PATCH, "/configs")
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DaemonError::ConfigRejected { status, message });
        }
        Ok(())
    }

    /// Ask the daemon to reload its config file from disk.
    pub async fn reload_config_file(&self) -> Result<(), DaemonError> {
        let body = serde_json::json!({ "path": "", "payload": "" });
        let response = self
            .request(reqwest::Method::PUT, "/configs?force=true")
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DaemonError::ConfigRejected { status, message });
        }
        Ok(())
    }

    /// Trigger a GEO database update on the daemon.
    pub async fn update_geo_databases(&self) -> Result<(), DaemonError> {
        let body = serde_json::json!({ "path": "", "payload": "" });
        let response = self
            .request(reqwest::Method::POST, "/configs/geo")
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(server_error(response).await);
        }
        Ok(())
    }

    /// Flush the daemon's fake-IP pool.
    pub async fn flush_fakeip_pool(&self) -> Result<(), DaemonError> {
        let response = self
            .request(reqwest::Method::POST, "/cache/fakeip/flush")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(server_error(response).await);
        }
        Ok(())
    }

    /// Close every open connection. Used after TUN-mode changes to avoid
    /// stale routed connections.
    pub async fn close_all_connections(&self) -> Result<(), DaemonError> {
        let response = self
            .request(reqwest::Method::DELETE, "/connections")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(server_error(response).await);
        }
        Ok(())
    }

    /// Fetch the daemon version. Never fails: when the daemon gives no usable
    /// answer the documented defaults are substituted.
    pub async fn fetch_version(&self) -> Version {
        let version = match self.request(reqwest::Method::GET, "/version").send().await {
            Ok(response) if response.status().is_success() => {
                response.json::<Version>().await.unwrap_or_default()
            }
            _ => Version::default(),
        };
        version.normalized()
    }

    /// Open the log stream, filtered to `level` and above.
    pub async fn stream_logs(&self, level: LogLevel) -> Result<ByteStream, DaemonError> {
        self.open_stream(&format!("/logs?level={}", level)).await
    }

    /// Open the connections stream. Each frame fully replaces the prior set.
    pub async fn stream_connections(&self) -> Result<ByteStream, DaemonError> {
        self.open_stream("/connections").await
    }

    async fn open_stream(&self, path: &str) -> Result<ByteStream, DaemonError> {
        let response = self.request(reqwest::Method::GET, path).send().await?;
        if !response.status().is_success() {
            return Err(server_error(response).await);
        }
        Ok(Box::pin(
            response.bytes_stream().map(|item| item.map_err(DaemonError::from)),
        ))
    }
}

async fn server_error(response: reqwest::Response) -> DaemonError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    DaemonError::ServerError { status, message }
}

/// Backward compatibility for older daemons using `socket-port`: a patch that
/// carries `socks-port` is transmitted with both names.
pub fn patch_compat(mut partial: serde_json::Value) -> serde_json::Value {
    if let Some(obj) = partial.as_object_mut() {
        if let Some(port) = obj.get("socks-port").cloned() {
            obj.insert("socket-port".to_string(), port);
        }
    }
    partial
}
