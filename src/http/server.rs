//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID, gatekeeper)
//! - Bind server to listener
//! - Apply gate rule reloads (patterns, sign-in target, lookup timeout) while running
//! - Serve the admin API on its own listener when enabled

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::uri::Authority,
    middleware,
    routing::{any, get},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::GatekeeperConfig;
use crate::gate::{GateConfigError, Gatekeeper, IdentityLookup};
use crate::http::middleware::{gatekeeper_middleware, GateState};
use crate::http::proxy::{proxy_handler, ProxyState};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::ShutdownSignal;

/// Failure constructing the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Gate(#[from] GateConfigError),

    #[error("invalid upstream address `{0}`")]
    Upstream(String),
}

/// HTTP server for the gatekeeper.
pub struct HttpServer {
    router: Router,
    config: GatekeeperConfig,
    gatekeeper: Arc<Gatekeeper>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and identity provider.
    pub fn new(config: GatekeeperConfig, lookup: Arc<dyn IdentityLookup>) -> Result<Self, ServerError> {
        let gatekeeper = Arc::new(Gatekeeper::from_config(&config, lookup)?);
        let upstream = Authority::from_str(&config.upstream.address)
            .map_err(|_| ServerError::Upstream(config.upstream.address.clone()))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let proxy_state = ProxyState {
            client,
            upstream,
            upstream_timeout: Duration::from_secs(config.timeouts.upstream_secs),
        };
        let gate_state = GateState {
            gatekeeper: gatekeeper.clone(),
            session_cookie: config.auth.session_cookie.as_str().into(),
        };

        let router = Self::build_router(&config, proxy_state, gate_state);
        Ok(Self {
            router,
            config,
            gatekeeper,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatekeeperConfig, proxy_state: ProxyState, gate_state: GateState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .route_layer(middleware::from_fn_with_state(gate_state, gatekeeper_middleware))
            .route("/healthz", get(healthz))
            .with_state(proxy_state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The request router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn gatekeeper(&self) -> Arc<Gatekeeper> {
        self.gatekeeper.clone()
    }

    /// Admin API router bound to this server's gatekeeper.
    pub fn admin_router(&self) -> Router {
        setup_admin_router(AdminState {
            gatekeeper: self.gatekeeper.clone(),
            api_key: self.config.admin.api_key.as_str().into(),
            upstream: self.config.upstream.address.as_str().into(),
        })
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires. Configs received on `config_updates` replace the
    /// gate rules in place.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatekeeperConfig>,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let gatekeeper = self.gatekeeper.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                match gatekeeper.reload(&new_config) {
                    Ok(()) => tracing::info!(
                        public_routes = new_config.routes.public_routes.len(),
                        api_routes = new_config.routes.api_routes.len(),
                        sign_in_path = %new_config.auth.sign_in_path,
                        lookup_timeout_ms = new_config.auth.lookup_timeout_ms,
                        "Gate rules reloaded"
                    ),
                    Err(e) => tracing::error!(error = %e, "Ignoring reload with invalid gate rules"),
                }
            }
        });

        let admin_shutdown = shutdown.clone();
        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            let admin_app = self.admin_router();
            tracing::info!(address = %admin_listener.local_addr()?, "Admin API starting");
            tokio::spawn(async move {
                let mut admin_shutdown = admin_shutdown;
                let served = axum::serve(admin_listener, admin_app)
                    .with_graceful_shutdown(async move {
                        admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = served {
                    tracing::error!(error = %e, "Admin API stopped with error");
                }
            });
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn healthz() -> &'static str {
    "ok"
}
