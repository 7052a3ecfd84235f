//! Gatekeeper middleware.
//! Applies the route gate to every proxied request.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, uri::PathAndQuery, HeaderMap, HeaderValue, Request, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use url::{Position, Url};

use crate::gate::{GateDecision, GateError, Gatekeeper, Identity, RequestCredentials};
use crate::http::request::RequestIdExt;
use crate::http::response::{error_response, local_error};

/// Header carrying the authenticated user ID to the upstream application.
pub const X_AUTHENTICATED_USER: &str = "x-authenticated-user";

/// State required by the gatekeeper middleware.
#[derive(Clone)]
pub struct GateState {
    pub gatekeeper: Arc<Gatekeeper>,
    pub session_cookie: Arc<str>,
}

pub async fn gatekeeper_middleware(
    State(state): State<GateState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // Never trust an identity header supplied by the client.
    req.headers_mut().remove(X_AUTHENTICATED_USER);

    let Some(url) = original_url(&req) else {
        return local_error(StatusCode::BAD_REQUEST, "BAD_REQUEST", "Missing Host header");
    };
    if !align_path(&mut req, &url) {
        return local_error(StatusCode::BAD_REQUEST, "BAD_REQUEST", "Invalid request path");
    }
    let credentials = RequestCredentials::from_headers(req.headers(), &state.session_cookie);

    match state.gatekeeper.decide(&url, &credentials).await {
        Ok(GateDecision::Allow { identity }) => {
            if let Some(identity) = identity {
                attach_identity(&mut req, identity);
            }
            next.run(req).await
        }
        Ok(GateDecision::AllowDeferred) => next.run(req).await,
        Ok(GateDecision::RedirectToSignIn { location }) => {
            tracing::info!(
                request_id = %req.request_id(),
                path = %url.path(),
                "Unauthenticated request, redirecting to sign-in"
            );
            Redirect::temporary(&location).into_response()
        }
        Err(GateError::Identity(e)) => {
            tracing::error!(request_id = %req.request_id(), error = %e, "Rejecting request, identity unavailable");
            error_response(StatusCode::BAD_GATEWAY, e.details())
        }
        Err(e @ GateError::RedirectTarget(_)) => {
            tracing::error!(request_id = %req.request_id(), error = %e, "Rejecting request");
            local_error(StatusCode::INTERNAL_SERVER_ERROR, "REDIRECT_ERROR", e.to_string())
        }
    }
}

fn attach_identity(req: &mut Request<Body>, identity: Identity) {
    match HeaderValue::from_str(&identity.user_id) {
        Ok(value) => {
            req.headers_mut().insert(X_AUTHENTICATED_USER, value);
        }
        Err(_) => {
            tracing::warn!(user_id = ?identity.user_id, "User ID not representable as header, not forwarded");
        }
    }
    req.extensions_mut().insert(identity);
}

/// Reconstruct the URL the client asked for, honoring forwarding headers.
pub fn original_url(req: &Request<Body>) -> Option<Url> {
    let headers = req.headers();
    let scheme = first_value(headers, "x-forwarded-proto")
        .or_else(|| req.uri().scheme_str())
        .unwrap_or("http");
    let host = first_value(headers, "x-forwarded-host")
        .or_else(|| first_value(headers, header::HOST.as_str()))
        .or_else(|| req.uri().authority().map(|a| a.as_str()))?;
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Url::parse(&format!("{scheme}://{host}{path_and_query}")).ok()
}

/// Make the request carry the normalized path and query the gate decides on,
/// so dot segments cannot reach the upstream in a form that was never
/// classified.
fn align_path(req: &mut Request<Body>, url: &Url) -> bool {
    let normalized = &url[Position::BeforePath..Position::AfterQuery];
    if req.uri().path_and_query().map(PathAndQuery::as_str) == Some(normalized) {
        return true;
    }

    let mut parts = req.uri().clone().into_parts();
    let Ok(path_and_query) = PathAndQuery::from_str(normalized) else {
        return false;
    };
    parts.path_and_query = Some(path_and_query);
    match Uri::from_parts(parts) {
        Ok(uri) => {
            tracing::debug!(raw = %req.uri(), normalized = %uri, "Request path normalized");
            *req.uri_mut() = uri;
            true
        }
        Err(_) => false,
    }
}

fn first_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_url_from_host() {
        let req = Request::builder()
            .uri("/projects/3?tab=ocr")
            .header("Host", "app.example.com")
            .body(Body::default())
            .unwrap();
        assert_eq!(
            original_url(&req).unwrap().as_str(),
            "http://app.example.com/projects/3?tab=ocr"
        );
    }

    #[test]
    fn test_original_url_prefers_forwarded_headers() {
        let req = Request::builder()
            .uri("/dashboard")
            .header("Host", "10.0.0.7:8080")
            .header("X-Forwarded-Proto", "https, http")
            .header("X-Forwarded-Host", "app.example.com")
            .body(Body::default())
            .unwrap();
        assert_eq!(
            original_url(&req).unwrap().as_str(),
            "https://app.example.com/dashboard"
        );
    }

    #[test]
    fn test_original_url_requires_host() {
        let req = Request::builder()
            .uri("/dashboard")
            .body(Body::default())
            .unwrap();
        assert!(original_url(&req).is_none());
    }

    #[test]
    fn test_align_path_removes_dot_segments() {
        let mut req = Request::builder()
            .uri("/a/./b/../projects?tab=1")
            .header("Host", "app.example.com")
            .body(Body::default())
            .unwrap();
        let url = original_url(&req).unwrap();

        assert!(align_path(&mut req, &url));
        assert_eq!(req.uri(), "/a/projects?tab=1");
        assert_eq!(url.path(), req.uri().path());
    }
}
