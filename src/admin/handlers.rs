use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::gate::{RouteClass, SignInTarget};

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub upstream: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoutesView {
    pub public_routes: Vec<String>,
    pub api_routes: Vec<String>,
    pub sign_in: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckParams {
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResult {
    pub path: String,
    pub class: RouteClass,
    pub outcome: String,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        upstream: state.upstream.to_string(),
    })
}

pub async fn get_routes(State(state): State<AdminState>) -> Json<RoutesView> {
    let rules = state.gatekeeper.rules();
    let sign_in = match &rules.sign_in {
        SignInTarget::Path(path) => path.clone(),
        SignInTarget::Url(url) => url.to_string(),
    };

    Json(RoutesView {
        public_routes: rules.patterns.public.patterns().iter().map(ToString::to_string).collect(),
        api_routes: rules.patterns.api.patterns().iter().map(ToString::to_string).collect(),
        sign_in,
    })
}

/// Classify a path without consulting the identity provider.
pub async fn get_check(
    State(state): State<AdminState>,
    Query(params): Query<CheckParams>,
) -> Json<CheckResult> {
    let class = state.gatekeeper.classify_path(&params.path);
    Json(CheckResult {
        path: params.path,
        class,
        outcome: class.as_str().to_string(),
    })
}
