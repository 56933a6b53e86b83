// crates/client/src/client.rs
//! Command dispatcher: one JSON command in, one JSON reply out.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::USER_AGENT;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::error::RcError;

/// A remote-control command: a flat JSON object of parameters.
pub type Command = Map<String, Value>;

/// Build a [`Command`] from a `json!` object literal. Non-objects yield an
/// empty command.
pub fn command(params: Value) -> Command {
    match params {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

const CLIENT_AGENT: &str = concat!("rcview/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout, connect plus read.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends commands to the daemon.
///
/// Implemented by [`RcClient`] for a single host and by
/// `SessionRegistry` for "whichever host is current".
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn send(
        &self,
        command: &Command,
        endpoint: &str,
        cancel: &CancellationToken,
    ) -> Result<RcResponse, RcError>;
}

/// A fully-read daemon reply, decoded on demand.
#[derive(Debug, Clone)]
pub struct RcResponse {
    status: u16,
    body: Bytes,
}

#[derive(Deserialize)]
struct ErrorReply {
    error: String,
}

impl RcResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Decode the body into `T`.
    ///
    /// A non-2xx reply carrying the daemon's `{"error": ...}` envelope is
    /// surfaced as [`RcError::Remote`] instead of being decoded.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, RcError> {
        if !(200..300).contains(&self.status) {
            if let Ok(reply) = serde_json::from_slice::<ErrorReply>(&self.body) {
                return Err(RcError::Remote(reply.error));
            }
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The raw JSON body, regardless of status.
    pub fn json(&self) -> Result<Value, RcError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// HTTP client bound to one daemon and one set of credentials.
#[derive(Debug, Clone)]
pub struct RcClient {
    url: Url,
    host: String,
    user: String,
    pass: String,
    http: reqwest::Client,
}

impl RcClient {
    pub fn new(host: &str, user: &str, pass: &str) -> Result<Self, RcError> {
        Self::with_timeout(host, user, pass, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        host: &str,
        user: &str,
        pass: &str,
        timeout: Duration,
    ) -> Result<Self, RcError> {
        let url = Url::parse(host).map_err(|e| RcError::InvalidHost {
            host: host.to_string(),
            reason: e.to_string(),
        })?;
        let hostname = url.host_str().ok_or_else(|| RcError::InvalidHost {
            host: host.to_string(),
            reason: "missing hostname".to_string(),
        })?;

        let mut normalized = format!("{}://{}", url.scheme(), hostname);
        if let Some(port) = url.port() {
            normalized.push_str(&format!(":{port}"));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            host: normalized,
            url,
            user: user.to_string(),
            pass: pass.to_string(),
            http,
        })
    }

    /// `scheme://host[:port]`, also the session key.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// `user@host[:port]`, or just the host without a user.
    pub fn user_info(&self) -> String {
        let authority = self.host.split_once("://").map_or(self.host.as_str(), |(_, a)| a);
        if self.user.is_empty() {
            authority.to_string()
        } else {
            format!("{}@{}", self.user, authority)
        }
    }

    pub fn has_credentials(&self, user: &str, pass: &str) -> bool {
        self.user == user && self.pass == pass
    }

    /// Whether the daemon's TCP port accepts connections within `timeout`.
    pub async fn dial(&self, timeout: Duration) -> bool {
        let Some(host) = self.url.host_str() else {
            return false;
        };
        let Some(port) = self.url.port_or_known_default() else {
            return false;
        };

        matches!(
            tokio::time::timeout(timeout, TcpStream::connect((host, port))).await,
            Ok(Ok(_))
        )
    }
}

#[async_trait]
impl Dispatch for RcClient {
    async fn send(
        &self,
        command: &Command,
        endpoint: &str,
        cancel: &CancellationToken,
    ) -> Result<RcResponse, RcError> {
        let mut request = self
            .http
            .post(format!("{}{}", self.host, endpoint))
            .header(USER_AGENT, CLIENT_AGENT)
            .json(command);
        if !self.user.is_empty() || !self.pass.is_empty() {
            request = request.basic_auth(&self.user, Some(&self.pass));
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(RcError::Cancelled(format!("{endpoint} cancelled")));
            }
            response = request.send() => response?,
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(endpoint, "daemon rejected credentials");
            return Err(RcError::Unauthorized);
        }

        let body = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(RcError::Cancelled(format!("{endpoint} cancelled")));
            }
            body = response.bytes() => body?,
        };

        tracing::trace!(endpoint, status = status.as_u16(), bytes = body.len(), "rc reply");
        Ok(RcResponse::new(status.as_u16(), body))
    }
}
