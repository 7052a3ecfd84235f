//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check route patterns compile
//! - Validate value ranges (timeouts > 0)
//! - Detect a sign-in path the gate itself would protect
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatekeeperConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::GatekeeperConfig;
use crate::routing::{PatternError, RoutePattern, RoutePatterns};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("routes.{group}: {source}")]
    Pattern {
        group: &'static str,
        #[source]
        source: PatternError,
    },

    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },

    #[error("auth.sign_in_path must not be empty")]
    EmptySignInPath,

    #[error("auth.sign_in_path `{0}` is neither an absolute path nor a valid URL")]
    InvalidSignInPath(String),

    #[error("auth.sign_in_path `{0}` is not covered by routes.public_routes and would redirect to itself")]
    SignInPathNotPublic(String),

    #[error("auth.provider_url `{0}` is not a valid URL")]
    InvalidProviderUrl(String),

    #[error("upstream.address must not be empty")]
    EmptyUpstream,
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatekeeperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (group, patterns) in [
        ("public_routes", &config.routes.public_routes),
        ("api_routes", &config.routes.api_routes),
    ] {
        for raw in patterns {
            if let Err(source) = RoutePattern::parse(raw) {
                errors.push(ValidationError::Pattern { group, source });
            }
        }
    }

    for (field, value) in [
        ("auth.lookup_timeout_ms", config.auth.lookup_timeout_ms),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout { field });
        }
    }

    let sign_in = config.auth.sign_in_path.trim();
    if sign_in.is_empty() {
        errors.push(ValidationError::EmptySignInPath);
    } else if sign_in.starts_with('/') {
        // Only checked when the patterns compiled; otherwise the pattern
        // errors above already describe the problem.
        if let Ok(patterns) = RoutePatterns::from_config(&config.routes) {
            if !patterns.is_public(sign_in) && !patterns.is_api(sign_in) {
                errors.push(ValidationError::SignInPathNotPublic(sign_in.to_string()));
            }
        }
    } else if url::Url::parse(sign_in).is_err() {
        errors.push(ValidationError::InvalidSignInPath(sign_in.to_string()));
    }

    if url::Url::parse(&config.auth.provider_url).is_err() {
        errors.push(ValidationError::InvalidProviderUrl(
            config.auth.provider_url.clone(),
        ));
    }

    if config.upstream.address.trim().is_empty() {
        errors.push(ValidationError::EmptyUpstream);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
