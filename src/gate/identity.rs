//! Identity lookup.
//!
//! # Responsibilities
//! - Extract the session token a request carries
//! - Ask the identity provider who, if anyone, the token belongs to
//!
//! # Design Decisions
//! - "No identity" is a normal answer, not an error
//! - Provider failures are errors; the gate never turns them into an allow
//! - Requests without a token never reach the provider

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, StatusCode};
use serde::Serialize;

use crate::config::AuthConfig;
use crate::errors::{classify, ErrorDetails, Thrown, TransportError};
use crate::gate::decision::Identity;

/// Credentials presented by a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCredentials {
    pub session_token: Option<String>,
}

impl RequestCredentials {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            session_token: Some(token.into()),
        }
    }

    /// Read the session cookie, falling back to an `Authorization: Bearer` header.
    pub fn from_headers(headers: &HeaderMap, cookie_name: &str) -> Self {
        let from_cookie = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == cookie_name)
            .map(|(_, value)| value.trim_matches('"').to_string());

        let session_token = from_cookie
            .or_else(|| {
                headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.strip_prefix("Bearer "))
                    .map(|t| t.trim().to_string())
            })
            .filter(|t| !t.is_empty());

        Self { session_token }
    }
}

/// Failure talking to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("identity provider request failed: {}", .0.message)]
    Transport(ErrorDetails),

    #[error("identity provider answered with status {0}")]
    UnexpectedStatus(u16),

    #[error("identity provider response could not be decoded: {0}")]
    InvalidResponse(String),
}

impl IdentityError {
    /// Normalized description for the client.
    pub fn details(&self) -> ErrorDetails {
        match self {
            Self::Transport(details) => details.clone(),
            Self::UnexpectedStatus(status) => ErrorDetails::from(&TransportError::with_status(*status, None)),
            Self::InvalidResponse(message) => classify(&Thrown::Error {
                message: message.clone(),
            }),
        }
    }
}

/// Resolves whether a request carries a valid authenticated user.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// `Ok(None)` means the credentials identify nobody.
    async fn lookup(&self, credentials: &RequestCredentials) -> Result<Option<Identity>, IdentityError>;
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
}

/// Identity provider reached over HTTP.
///
/// Posts `{"token": ...}` to the verification endpoint. `200` carries the
/// identity, `401`/`403`/`404` mean the token is not valid, anything else
/// is an error.
pub struct RemoteIdentityLookup {
    client: reqwest::Client,
    endpoint: url::Url,
    secret: Option<String>,
}

impl RemoteIdentityLookup {
    pub fn new(endpoint: url::Url, secret: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if is_loopback(&endpoint) {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            endpoint,
            secret,
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, RemoteLookupError> {
        let endpoint = url::Url::parse(&config.provider_url)?;
        // The gate enforces lookup_timeout_ms; the client timeout only
        // reclaims requests the gate has already given up on.
        let backstop = Duration::from_millis(config.lookup_timeout_ms).saturating_mul(2);
        Ok(Self::new(endpoint, config.provider_secret.clone(), backstop)?)
    }
}

fn is_loopback(endpoint: &url::Url) -> bool {
    match endpoint.host() {
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        Some(url::Host::Domain(domain)) => domain == "localhost",
        None => false,
    }
}

/// Failure building a [`RemoteIdentityLookup`].
#[derive(Debug, thiserror::Error)]
pub enum RemoteLookupError {
    #[error("invalid provider URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[async_trait]
impl IdentityLookup for RemoteIdentityLookup {
    async fn lookup(&self, credentials: &RequestCredentials) -> Result<Option<Identity>, IdentityError> {
        let Some(token) = credentials.session_token.as_deref() else {
            return Ok(None);
        };

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&VerifyRequest { token });
        if let Some(secret) = &self.secret {
            request = request.bearer_auth(secret);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IdentityError::Transport(ErrorDetails::from(&Thrown::from(&e))))?;

        match response.status() {
            StatusCode::OK => response
                .json::<Identity>()
                .await
                .map(Some)
                .map_err(|e| IdentityError::InvalidResponse(e.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            other => Err(IdentityError::UnexpectedStatus(other.as_u16())),
        }
    }
}

/// Fixed token table, for development and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityLookup {
    sessions: HashMap<String, Identity>,
}

impl StaticIdentityLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.sessions.insert(token.into(), identity);
        self
    }
}

#[async_trait]
impl IdentityLookup for StaticIdentityLookup {
    async fn lookup(&self, credentials: &RequestCredentials) -> Result<Option<Identity>, IdentityError> {
        Ok(credentials
            .session_token
            .as_deref()
            .and_then(|t| self.sessions.get(t))
            .cloned())
    }
}
