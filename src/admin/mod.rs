//! Admin API.
//!
//! Bearer-token protected, served on its own listener.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::gate::Gatekeeper;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub gatekeeper: Arc<Gatekeeper>,
    pub api_key: Arc<str>,
    pub upstream: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/routes", get(get_routes))
        .route("/admin/check", get(get_check))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
