//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    routing::{any, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use route_gatekeeper::config::GatekeeperConfig;
use route_gatekeeper::gate::{Identity, IdentityError, IdentityLookup, RequestCredentials};

/// Serve `app` on an ephemeral port and return its address.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Start an upstream application that echoes the path and the
/// authenticated-user header it received.
pub async fn start_echo_upstream() -> SocketAddr {
    async fn echo(uri: Uri, headers: HeaderMap) -> impl IntoResponse {
        let user = headers
            .get("x-authenticated-user")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let request_id = headers.contains_key("x-request-id");
        Json(json!({ "path": uri.path(), "user": user, "request_id": request_id }))
    }

    serve(Router::new().route("/", any(echo)).route("/{*path}", any(echo))).await
}

/// Start an upstream application that answers every request after `delay`.
#[allow(dead_code)]
pub async fn start_slow_upstream(delay: Duration) -> SocketAddr {
    let app = Router::new().route(
        "/{*path}",
        any(move || async move {
            tokio::time::sleep(delay).await;
            "late"
        }),
    );
    serve(app).await
}

/// Start an identity provider answering session verification requests.
///
/// Tokens: `good` → user_1, `slow` → user_1 after 2s, `boom` → 500,
/// anything else → 401.
#[allow(dead_code)]
pub async fn start_identity_provider() -> SocketAddr {
    async fn verify(Json(body): Json<Value>) -> impl IntoResponse {
        match body.get("token").and_then(Value::as_str) {
            Some("good") => (StatusCode::OK, Json(json!({ "user_id": "user_1", "session_id": "sess_1" }))),
            Some("slow") => {
                tokio::time::sleep(Duration::from_secs(2)).await;
                (StatusCode::OK, Json(json!({ "user_id": "user_1" })))
            }
            Some("boom") => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "down" }))),
            _ => (StatusCode::UNAUTHORIZED, Json(json!({ "message": "invalid session" }))),
        }
    }

    serve(Router::new().route("/v1/sessions/verify", post(verify))).await
}

/// Configuration pointing at the given upstream, everything else default.
pub fn config_for(upstream: SocketAddr) -> GatekeeperConfig {
    let mut config = GatekeeperConfig::default();
    config.upstream.address = upstream.to_string();
    config.auth.lookup_timeout_ms = 500;
    config.admin.api_key = "admin-secret".into();
    config
}

/// Lookup that counts calls and answers with a fixed result.
#[allow(dead_code)]
pub struct CountingLookup {
    pub calls: AtomicUsize,
    answer: Result<Option<Identity>, IdentityError>,
}

#[allow(dead_code)]
impl CountingLookup {
    pub fn new(answer: Result<Option<Identity>, IdentityError>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            answer,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityLookup for CountingLookup {
    async fn lookup(&self, _: &RequestCredentials) -> Result<Option<Identity>, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}
