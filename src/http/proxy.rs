//! Upstream forwarding.
//!
//! # Responsibilities
//! - Rewrite the request URI to the upstream address
//! - Forward with a bounded wait
//! - Normalize upstream failures into `ErrorDetails` responses
//!
//! # Design Decisions
//! - Bodies are streamed, never buffered (no retries here)
//! - Connection failures → 502, timeouts → 504

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{uri::{Authority, PathAndQuery, Scheme}, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use hyper_util::client::legacy::{connect::HttpConnector, Client};

use crate::errors::{ErrorDetails, TransportError};
use crate::http::request::RequestIdExt;
use crate::http::response::{error_response, local_error};
use crate::observability::metrics;

/// State for the forwarding handler.
#[derive(Clone)]
pub struct ProxyState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: Authority,
    pub upstream_timeout: Duration,
}

pub async fn proxy_handler(State(state): State<ProxyState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request.request_id().to_string();
    let method = request.method().to_string();

    let (mut parts, body) = request.into_parts();
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.upstream.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Could not rewrite request URI");
            return local_error(StatusCode::BAD_REQUEST, "BAD_REQUEST", "Invalid request URI");
        }
    };

    tracing::debug!(request_id = %request_id, method = %method, uri = %parts.uri, "Forwarding request");

    let forwarded = tokio::time::timeout(
        state.upstream_timeout,
        state.client.request(Request::from_parts(parts, body)),
    )
    .await;

    let (status, response) = match forwarded {
        Ok(Ok(response)) => {
            let status = response.status();
            let (parts, body) = response.into_parts();
            (status, Response::from_parts(parts, Body::new(body)).into_response())
        }
        Ok(Err(e)) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            let code = if e.is_connect() { "ERR_NETWORK" } else { "ERR_BAD_RESPONSE" };
            let details = ErrorDetails::from(&TransportError::without_response("Upstream request failed", code));
            (StatusCode::BAD_GATEWAY, error_response(StatusCode::BAD_GATEWAY, details))
        }
        Err(_) => {
            tracing::error!(
                request_id = %request_id,
                timeout_secs = state.upstream_timeout.as_secs(),
                "Upstream timed out"
            );
            let details = ErrorDetails::from(&TransportError::without_response("Upstream timed out", "ECONNABORTED"));
            (StatusCode::GATEWAY_TIMEOUT, error_response(StatusCode::GATEWAY_TIMEOUT, details))
        }
    };

    metrics::record_request(&method, status.as_u16(), start);
    response
}
