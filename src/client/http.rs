//! HTTP API of the Trixie service.
//!
//! [`ApiClient`] wraps `reqwest::Client` and covers the endpoints the
//! command-line client needs besides the streaming session:
//!
//! | Method | Endpoint | Purpose |
//! |--------|----------|---------|
//! | `GET` | `/auth/3600` | Renew the stored token |
//! | `GET` | `/auth` | Log in with username and password |
//! | `POST` | `/action/<action>` | Run an action without streaming |
//!
//! Every request carries `Connection: close`; authenticated requests carry
//! the token in `X-Trixie-Auth`.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{CONNECTION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::output::OutputSink;
use crate::protocol::{Descriptor, OutputLine};

// ============================================================================
// Constants
// ============================================================================

/// Header carrying the auth token.
pub const AUTH_HEADER: &str = "X-Trixie-Auth";

/// Lifetime requested when renewing, in seconds.
pub const RENEW_VALIDITY_SECS: u32 = 3600;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Wire Types
// ============================================================================

/// Token issued by `/auth`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthGrant {
    /// The new token.
    pub token: String,
    /// Unix time until which the token is valid.
    #[serde(rename = "tokenValidity")]
    pub validity: u32,
}

#[derive(Debug, Serialize)]
struct ActionPayload<'a> {
    params: &'a [String],
}

/// One output line of a non-streamed action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteLine {
    /// Target descriptor number.
    #[serde(default)]
    pub fd: u8,
    /// Line text.
    #[serde(default)]
    pub log: String,
}

/// Body returned by `/action/<action>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteResponse {
    /// Collected standard output.
    #[serde(default)]
    pub stdout: String,
    /// Collected standard error.
    #[serde(default)]
    pub stderr: String,
    /// Interleaved output, when the server kept the order.
    #[serde(default)]
    pub output: Vec<RemoteLine>,
    /// Failure description, empty on success.
    #[serde(default)]
    pub error: String,
}

impl RemoteResponse {
    /// Exit code for a response received with HTTP `status`.
    #[must_use]
    pub fn exit_code(&self, status: u16) -> u8 {
        u8::from(status >= 400 || !self.error.is_empty())
    }

    /// Replays the response through `sink`.
    ///
    /// Ordered `output` lines win over the collected `stdout`/`stderr`.
    pub fn render(&self, sink: &dyn OutputSink) {
        if self.output.is_empty() {
            if !self.stdout.is_empty() {
                sink.write(Descriptor::Stdout, &self.stdout);
            }
            if !self.stderr.is_empty() {
                sink.write(Descriptor::Stderr, &self.stderr);
            }
        } else {
            for line in &self.output {
                sink.dispatch(&OutputLine::classify(line.fd, &line.log));
            }
        }

        if !self.error.is_empty() {
            sink.write(Descriptor::Stderr, &format!("{}\n", self.error));
        }
    }
}

// ============================================================================
// ApiClient
// ============================================================================

/// HTTP client for one Trixie service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// Creates a client for the service at `base_url`.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// The service URL without trailing slash.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The token sent with authenticated requests.
    #[inline]
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Replaces the token.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }

    /// `GET /auth/3600`: trades the current token for a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RenewFailed`] for any status but `200`.
    pub async fn renew(&self) -> Result<AuthGrant> {
        let url = format!("{}/auth/{RENEW_VALIDITY_SECS}", self.base_url);
        debug!(%url, "Renewing token");

        let response = self
            .http
            .get(url)
            .header(AUTH_HEADER, &self.token)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::RenewFailed {
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    /// `GET /auth` with basic credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LoginFailed`] for any status but `200`.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthGrant> {
        let url = format!("{}/auth", self.base_url);
        debug!(%url, username, "Logging in");

        let response = self
            .http
            .get(url)
            .basic_auth(username, Some(password))
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(Error::LoginFailed);
        }

        Ok(response.json().await?)
    }

    /// `POST /action/<action>`: runs an action and returns the status with
    /// the collected output.
    ///
    /// An error status with a body that is not a response object is reported
    /// through [`RemoteResponse::error`].
    pub async fn execute(&self, action: &str, params: &[String]) -> Result<(u16, RemoteResponse)> {
        let url = format!("{}/action/{action}", self.base_url);
        debug!(%url, params = params.len(), "Executing over HTTP");

        let response = self
            .http
            .post(url)
            .header(AUTH_HEADER, &self.token)
            .json(&ActionPayload { params })
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        let parsed = match serde_json::from_str::<RemoteResponse>(&body) {
            Ok(parsed) => parsed,
            Err(_) if status >= 400 => RemoteResponse {
                error: format!("HTTP {status}: {}", body.trim()),
                ..RemoteResponse::default()
            },
            Err(e) => return Err(Error::decode(format!("action response: {e}"))),
        };

        debug!(status, error = %parsed.error, "Action finished");
        Ok((status, parsed))
    }
}

// ============================================================================
// Tests
// ============================================================================
