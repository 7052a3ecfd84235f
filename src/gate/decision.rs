//! Gate outcomes.

use serde::{Deserialize, Serialize};

/// An authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(alias = "sub", alias = "userId")]
    pub user_id: String,
    #[serde(default, alias = "sessionId", alias = "sid")]
    pub session_id: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: None,
        }
    }
}

/// What happens to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Proceed. Carries the identity when one was looked up.
    Allow { identity: Option<Identity> },
    /// Proceed; the handler enforces its own authentication.
    AllowDeferred,
    /// Send the client to sign in, then back to where it was going.
    RedirectToSignIn { location: String },
}

impl GateDecision {
    /// Label used in logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Allow { .. } => "allow",
            Self::AllowDeferred => "allow_deferred",
            Self::RedirectToSignIn { .. } => "redirect",
        }
    }
}

/// Which pattern group a path falls in, before any identity lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    Api,
    Public,
    Protected,
}

impl RouteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "allow_deferred",
            Self::Public => "allow",
            Self::Protected => "requires_identity",
        }
    }
}
