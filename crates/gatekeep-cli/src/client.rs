//! HTTP client for the Gatekeep operator API.
//!
//! Every request carries the operator credential as a default header. Non-2xx
//! responses are decoded from the server's `{error, message}` body when
//! possible.

use std::fmt::Write as _;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use gatekeep_core::wire::{
    DeviceView, ErrorBody, LogRecord, OccupancyView, Page, QueueCommandsRequest,
    QueueCommandsResponse,
};
use gatekeep_core::{CredentialId, MacAddress};

/// Operator client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server rejected the request ({status} {kind}): {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// How the operator authenticates.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Operator JWT issued by the dashboard or `gatekeep-server mint-token`.
    Bearer(String),
    /// Admin username and password.
    Basic { username: String, password: String },
}

impl Credentials {
    fn header_value(&self) -> Result<HeaderValue, ClientError> {
        let raw = match self {
            Self::Bearer(token) => format!("Bearer {token}"),
            Self::Basic { username, password } => {
                format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
            }
        };
        let mut value = HeaderValue::from_str(&raw)
            .map_err(|_| ClientError::Config("credential contains invalid characters".into()))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// Which slice of the access log to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogQuery {
    All,
    User(CredentialId),
    Card(CredentialId),
}

/// Build the path and query string for a log listing.
pub fn logs_path(query: LogQuery, page: Option<u32>, limit: Option<u32>) -> String {
    let mut path = match query {
        LogQuery::All => "/logs".to_string(),
        LogQuery::User(id) => format!("/logs/by-user?userId={id}"),
        LogQuery::Card(id) => format!("/logs/by-card?cardId={id}"),
    };
    for (key, value) in [("page", page), ("limit", limit)] {
        if let Some(v) = value {
            let sep = if path.contains('?') { '&' } else { '?' };
            let _ = write!(path, "{sep}{key}={v}");
        }
    }
    path
}

/// Gatekeep operator API client.
#[derive(Debug)]
pub struct GateClient {
    http: reqwest::Client,
    base_url: String,
}

impl GateClient {
    pub fn new(base_url: &str, credentials: &Credentials) -> Result<Self, ClientError> {
        let base_url = base_url.trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ClientError::Config("server URL is empty".into()));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "server URL {base_url:?} must start with http:// or https://"
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, credentials.header_value()?);

        // reqwest is built with rustls-no-provider; Err means one is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }
        let (kind, message) = match resp.json::<ErrorBody>().await {
            Ok(body) => (body.error, body.message),
            Err(_) => (
                "http".to_string(),
                status.canonical_reason().unwrap_or("Unknown").to_string(),
            ),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            kind,
            message,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        debug!(path, "GET");
        let resp = self.http.get(self.url(path)).send().await?;
        Self::decode(resp).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, ClientError> {
        debug!(path, "POST");
        let mut req = self.http.post(self.url(path));
        if let Some(body) = body {
            req = req.json(body);
        }
        Self::decode(req.send().await?).await
    }

    /// `GET /health`; returns the reported status string.
    pub async fn health(&self) -> Result<String, ClientError> {
        let body: Value = self.get("/health").await?;
        Ok(body
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string())
    }

    pub async fn queue_commands(
        &self,
        request: &QueueCommandsRequest,
    ) -> Result<QueueCommandsResponse, ClientError> {
        let body = serde_json::to_value(request)
            .map_err(|e| ClientError::Config(format!("cannot encode request: {e}")))?;
        self.post("/commands/queue", Some(&body)).await
    }

    pub async fn list_logs(
        &self,
        query: LogQuery,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Page<LogRecord>, ClientError> {
        self.get(&logs_path(query, page, limit)).await
    }

    pub async fn device_status(&self, mac: &MacAddress) -> Result<DeviceView, ClientError> {
        self.get(&format!("/devices/{mac}")).await
    }

    pub async fn occupancy(&self, card_id: CredentialId) -> Result<OccupancyView, ClientError> {
        self.get(&format!("/occupancy/{card_id}")).await
    }

    pub async fn exit_occupancy(
        &self,
        card_id: CredentialId,
    ) -> Result<OccupancyView, ClientError> {
        self.post(&format!("/occupancy/{card_id}/exit"), None).await
    }

    pub async fn reset_occupancy(
        &self,
        card_id: CredentialId,
    ) -> Result<OccupancyView, ClientError> {
        self.post(&format!("/occupancy/{card_id}/reset"), None).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn logs_path_builds_query_strings() {
        assert_eq!(logs_path(LogQuery::All, None, None), "/logs");
        assert_eq!(
            logs_path(LogQuery::All, Some(2), Some(5)),
            "/logs?page=2&limit=5"
        );
        assert_eq!(
            logs_path(LogQuery::User(CredentialId(7)), None, Some(3)),
            "/logs/by-user?userId=7&limit=3"
        );
        assert_eq!(
            logs_path(LogQuery::Card(CredentialId(42)), Some(1), None),
            "/logs/by-card?cardId=42&page=1"
        );
    }

    #[test]
    fn basic_credentials_are_base64_encoded() {
        let creds = Credentials::Basic {
            username: "admin".into(),
            password: "s3cret".into(),
        };
        let value = creds.header_value().unwrap();
        assert_eq!(value.to_str().unwrap(), "Basic YWRtaW46czNjcmV0");
        assert!(value.is_sensitive());
    }

    #[test]
    fn bearer_with_newline_is_rejected() {
        let creds = Credentials::Bearer("abc\ndef".into());
        assert!(matches!(
            creds.header_value(),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client =
            GateClient::new("http://gate.local:3002/", &Credentials::Bearer("t".into())).unwrap();
        assert_eq!(client.url("/health"), "http://gate.local:3002/health");
    }

    #[test]
    fn client_rejects_non_http_urls() {
        let creds = Credentials::Bearer("t".into());
        assert!(GateClient::new("", &creds).is_err());
        assert!(GateClient::new("gate.local:3002", &creds).is_err());
    }
}
