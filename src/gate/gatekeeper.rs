//! Route gatekeeper.
//!
//! # Decision Table
//! ```text
//! path ∈ api patterns     → AllowDeferred     (no lookup)
//! path ∈ public patterns  → Allow             (no lookup)
//! otherwise               → identity lookup, bounded by timeout
//!     Some(identity)      → Allow { identity }
//!     None | timeout      → RedirectToSignIn  (?redirect_url=<original url>)
//!     Err                 → GateError (caller must not allow)
//! ```

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use url::Url;

use crate::config::GatekeeperConfig;
use crate::gate::decision::{GateDecision, RouteClass};
use crate::gate::identity::{IdentityError, IdentityLookup, RequestCredentials};
use crate::observability::metrics;
use crate::routing::{PatternError, RoutePatterns};

/// Query parameter carrying the originally requested URL.
pub const REDIRECT_PARAM: &str = "redirect_url";

/// Where unauthenticated users are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInTarget {
    /// Absolute path on the requested origin.
    Path(String),
    /// Fully qualified URL, e.g. a hosted sign-in page.
    Url(Url),
}

impl SignInTarget {
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        let raw = raw.trim();
        if raw.starts_with('/') {
            Ok(Self::Path(raw.to_string()))
        } else {
            Url::parse(raw).map(Self::Url)
        }
    }

    /// Build the redirect location for a request to `original`.
    pub fn location_for(&self, original: &Url) -> Result<String, url::ParseError> {
        let mut target = match self {
            Self::Path(path) => original.join(path)?,
            Self::Url(url) => url.clone(),
        };
        target
            .query_pairs_mut()
            .append_pair(REDIRECT_PARAM, original.as_str());
        Ok(target.into())
    }
}

/// Failure deciding a request. Never to be treated as an allow.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("failed to build sign-in redirect: {0}")]
    RedirectTarget(#[from] url::ParseError),
}

/// Failure building a gatekeeper from configuration.
#[derive(Debug, thiserror::Error)]
pub enum GateConfigError {
    #[error("invalid route pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error("invalid sign-in target: {0}")]
    SignIn(#[from] url::ParseError),
}

/// Everything a decision reads from configuration. Replaced as one unit on
/// reload so patterns and the sign-in target never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRules {
    pub patterns: RoutePatterns,
    pub sign_in: SignInTarget,
    pub lookup_timeout: Duration,
}

impl GateRules {
    pub fn from_config(config: &GatekeeperConfig) -> Result<Self, GateConfigError> {
        Ok(Self {
            patterns: RoutePatterns::from_config(&config.routes)?,
            sign_in: SignInTarget::parse(&config.auth.sign_in_path)?,
            lookup_timeout: Duration::from_millis(config.auth.lookup_timeout_ms),
        })
    }

    /// Which group a path falls in. API patterns take precedence.
    pub fn classify_path(&self, path: &str) -> RouteClass {
        if self.patterns.is_api(path) {
            RouteClass::Api
        } else if self.patterns.is_public(path) {
            RouteClass::Public
        } else {
            RouteClass::Protected
        }
    }
}

/// Decides whether requests proceed, defer, or go to sign-in.
pub struct Gatekeeper {
    rules: ArcSwap<GateRules>,
    lookup: Arc<dyn IdentityLookup>,
}

impl Gatekeeper {
    pub fn new(rules: GateRules, lookup: Arc<dyn IdentityLookup>) -> Self {
        Self {
            rules: ArcSwap::from_pointee(rules),
            lookup,
        }
    }

    pub fn from_config(
        config: &GatekeeperConfig,
        lookup: Arc<dyn IdentityLookup>,
    ) -> Result<Self, GateConfigError> {
        Ok(Self::new(GateRules::from_config(config)?, lookup))
    }

    /// Current rules snapshot.
    pub fn rules(&self) -> Arc<GateRules> {
        self.rules.load_full()
    }

    /// Atomically replace the rules. In-flight decisions keep the snapshot
    /// they started with.
    pub fn replace_rules(&self, rules: GateRules) {
        self.rules.store(Arc::new(rules));
    }

    /// Rebuild the rules from `config` and swap them in. On error the
    /// running rules stay untouched.
    pub fn reload(&self, config: &GatekeeperConfig) -> Result<(), GateConfigError> {
        self.replace_rules(GateRules::from_config(config)?);
        Ok(())
    }

    pub fn classify_path(&self, path: &str) -> RouteClass {
        self.rules.load().classify_path(path)
    }

    /// Decide what happens to a request for `url`.
    pub async fn decide(
        &self,
        url: &Url,
        credentials: &RequestCredentials,
    ) -> Result<GateDecision, GateError> {
        let rules = self.rules.load_full();
        let decision = match rules.classify_path(url.path()) {
            RouteClass::Api => GateDecision::AllowDeferred,
            RouteClass::Public => GateDecision::Allow { identity: None },
            RouteClass::Protected => self.decide_protected(&rules, url, credentials).await?,
        };

        metrics::record_decision(decision.outcome());
        Ok(decision)
    }

    async fn decide_protected(
        &self,
        rules: &GateRules,
        url: &Url,
        credentials: &RequestCredentials,
    ) -> Result<GateDecision, GateError> {
        let looked_up = tokio::time::timeout(rules.lookup_timeout, self.lookup.lookup(credentials)).await;

        let identity = match looked_up {
            Ok(Ok(identity)) => {
                metrics::record_lookup(if identity.is_some() { "found" } else { "absent" });
                identity
            }
            Ok(Err(e)) => {
                metrics::record_lookup("error");
                tracing::error!(path = %url.path(), error = %e, "Identity lookup failed");
                return Err(e.into());
            }
            Err(_) => {
                metrics::record_lookup("timeout");
                tracing::warn!(
                    path = %url.path(),
                    timeout_ms = rules.lookup_timeout.as_millis() as u64,
                    "Identity lookup timed out, redirecting to sign-in"
                );
                None
            }
        };

        match identity {
            Some(identity) => {
                tracing::debug!(path = %url.path(), user_id = %identity.user_id, "Identity resolved");
                Ok(GateDecision::Allow {
                    identity: Some(identity),
                })
            }
            None => Ok(GateDecision::RedirectToSignIn {
                location: rules.sign_in.location_for(url)?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::config::RoutesConfig;
    use crate::gate::decision::Identity;
    use crate::gate::identity::StaticIdentityLookup;
    use crate::routing::PatternSet;

    /// Counts calls and answers with a fixed result.
    struct CountingLookup {
        calls: AtomicUsize,
        answer: Result<Option<Identity>, IdentityError>,
        delay: Duration,
    }

    impl CountingLookup {
        fn new(answer: Result<Option<Identity>, IdentityError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                answer,
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl IdentityLookup for CountingLookup {
        async fn lookup(&self, _: &RequestCredentials) -> Result<Option<Identity>, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.answer.clone()
        }
    }

    fn rules() -> GateRules {
        GateRules {
            patterns: RoutePatterns::from_config(&RoutesConfig::default()).unwrap(),
            sign_in: SignInTarget::parse("/sign-in").unwrap(),
            lookup_timeout: Duration::from_millis(100),
        }
    }

    fn gatekeeper(lookup: Arc<dyn IdentityLookup>) -> Gatekeeper {
        Gatekeeper::new(rules(), lookup)
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn redirect_param(location: &str) -> String {
        let location = Url::parse(location).unwrap();
        location
            .query_pairs()
            .find(|(k, _)| k == REDIRECT_PARAM)
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[tokio::test]
    async fn test_api_routes_deferred_without_lookup() {
        let lookup = Arc::new(CountingLookup::new(Ok(None)));
        let gate = gatekeeper(lookup.clone());

        for path in ["/api", "/api/projects", "/api/jobs/7/status"] {
            let decision = gate
                .decide(&url(&format!("https://app.example.com{path}")), &RequestCredentials::default())
                .await
                .unwrap();
            assert_eq!(decision, GateDecision::AllowDeferred);
        }
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_public_routes_allowed_without_lookup() {
        let lookup = Arc::new(CountingLookup::new(Err(IdentityError::UnexpectedStatus(500))));
        let gate = gatekeeper(lookup.clone());

        for path in ["/", "/sign-in", "/sign-in/anything", "/sign-up", "/sign-up/anything"] {
            let decision = gate
                .decide(&url(&format!("https://app.example.com{path}")), &RequestCredentials::default())
                .await
                .unwrap();
            assert_eq!(decision, GateDecision::Allow { identity: None }, "{path}");
        }
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_protected_route_redirects_with_original_url() {
        let gate = gatekeeper(Arc::new(StaticIdentityLookup::new()));
        let original = url("https://app.example.com/projects/42?tab=reports&q=a%20b");

        let decision = gate.decide(&original, &RequestCredentials::default()).await.unwrap();
        let GateDecision::RedirectToSignIn { location } = decision else {
            panic!("expected redirect");
        };
        assert!(location.starts_with("https://app.example.com/sign-in?"));
        assert_eq!(redirect_param(&location), original.as_str());
    }

    #[tokio::test]
    async fn test_protected_route_allowed_with_identity() {
        let lookup = StaticIdentityLookup::new().with_session("tok", Identity::new("user_1"));
        let gate = gatekeeper(Arc::new(lookup));

        let decision = gate
            .decide(&url("https://app.example.com/dashboard"), &RequestCredentials::with_token("tok"))
            .await
            .unwrap();
        assert_eq!(
            decision,
            GateDecision::Allow {
                identity: Some(Identity::new("user_1"))
            }
        );
    }

    #[tokio::test]
    async fn test_lookup_error_propagates() {
        let gate = gatekeeper(Arc::new(CountingLookup::new(Err(IdentityError::UnexpectedStatus(502)))));

        let result = gate
            .decide(&url("https://app.example.com/dashboard"), &RequestCredentials::with_token("tok"))
            .await;
        assert!(matches!(
            result,
            Err(GateError::Identity(IdentityError::UnexpectedStatus(502)))
        ));
    }

    #[tokio::test]
    async fn test_lookup_timeout_redirects() {
        let mut slow = CountingLookup::new(Ok(Some(Identity::new("user_1"))));
        slow.delay = Duration::from_secs(5);
        let gate = gatekeeper(Arc::new(slow));

        let decision = gate
            .decide(&url("https://app.example.com/dashboard"), &RequestCredentials::with_token("tok"))
            .await
            .unwrap();
        assert!(matches!(decision, GateDecision::RedirectToSignIn { .. }));
    }

    #[tokio::test]
    async fn test_absolute_sign_in_target() {
        let gate = Gatekeeper::new(
            GateRules {
                sign_in: SignInTarget::parse("https://accounts.example.com/sign-in").unwrap(),
                ..rules()
            },
            Arc::new(StaticIdentityLookup::new()),
        );
        let original = url("https://app.example.com/settings");

        let GateDecision::RedirectToSignIn { location } =
            gate.decide(&original, &RequestCredentials::default()).await.unwrap()
        else {
            panic!("expected redirect");
        };
        assert!(location.starts_with("https://accounts.example.com/sign-in?redirect_url="));
        assert_eq!(redirect_param(&location), original.as_str());
    }

    #[tokio::test]
    async fn test_custom_patterns_and_reload() {
        let gate = Gatekeeper::new(
            GateRules {
                patterns: RoutePatterns::new(
                    PatternSet::parse(["/", "/docs*"]).unwrap(),
                    PatternSet::parse(["/rpc*"]).unwrap(),
                ),
                sign_in: SignInTarget::parse("/").unwrap(),
                lookup_timeout: Duration::from_millis(100),
            },
            Arc::new(StaticIdentityLookup::new()),
        );
        assert_eq!(gate.classify_path("/docs/intro"), RouteClass::Public);
        assert_eq!(gate.classify_path("/rpc/call"), RouteClass::Api);
        assert_eq!(gate.classify_path("/api/call"), RouteClass::Protected);

        gate.replace_rules(rules());
        assert_eq!(gate.classify_path("/docs/intro"), RouteClass::Protected);
        assert_eq!(gate.classify_path("/api/call"), RouteClass::Api);
    }

    #[tokio::test]
    async fn test_reload_moves_sign_in_with_patterns() {
        let gate = gatekeeper(Arc::new(StaticIdentityLookup::new()));

        let mut config = GatekeeperConfig::default();
        config.routes.public_routes = vec!["/".into(), "/login*".into()];
        config.auth.sign_in_path = "/login".into();
        config.auth.lookup_timeout_ms = 250;
        gate.reload(&config).unwrap();

        let rules = gate.rules();
        assert_eq!(rules.sign_in, SignInTarget::Path("/login".into()));
        assert_eq!(rules.lookup_timeout, Duration::from_millis(250));

        let GateDecision::RedirectToSignIn { location } = gate
            .decide(&url("https://app.example.com/dashboard"), &RequestCredentials::default())
            .await
            .unwrap()
        else {
            panic!("expected redirect");
        };
        assert!(location.starts_with("https://app.example.com/login?"));

        // The new target is reachable without a session.
        let target = url(&location);
        assert_eq!(
            gate.decide(&target, &RequestCredentials::default()).await.unwrap(),
            GateDecision::Allow { identity: None }
        );
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_running_rules() {
        let gate = gatekeeper(Arc::new(StaticIdentityLookup::new()));

        let mut config = GatekeeperConfig::default();
        config.routes.public_routes = vec!["/a*/b".into()];
        assert!(gate.reload(&config).is_err());
        assert_eq!(*gate.rules(), rules());
    }
}
