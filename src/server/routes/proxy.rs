use crate::server::{
    AppState,
    forwarder::{IncomingRequest, ProxyOutcome},
};
use axum::{
    Json,
    body::Body,
    extract::{Path, RawQuery, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use url::form_urlencoded;

#[derive(Serialize)]
struct UpstreamErrorResponse {
    error: &'static str,
    message: Value,
}

#[derive(Serialize)]
struct ServiceUnavailableResponse {
    error: &'static str,
    message: &'static str,
    details: String,
}

/// Proxy requests addressed to the upstream API root (an empty path suffix).
pub async fn proxy_root_handler(state: State<Arc<AppState>>, query: RawQuery) -> Response {
    forward_and_respond(state, String::new(), query).await
}

/// Proxy requests for everything under the proxy prefix.
pub async fn proxy_handler(
    state: State<Arc<AppState>>,
    Path(path): Path<String>,
    query: RawQuery,
) -> Response {
    forward_and_respond(state, path, query).await
}

async fn forward_and_respond(
    State(state): State<Arc<AppState>>,
    path_suffix: String,
    RawQuery(raw_query): RawQuery,
) -> Response {
    let query = raw_query
        .as_deref()
        .map(|raw| {
            form_urlencoded::parse(raw.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();

    match state
        .forwarder
        .forward(IncomingRequest { path_suffix, query })
        .await
    {
        ProxyOutcome::Success {
            status,
            content_type,
            body,
        } => {
            let mut response = Response::new(Body::from(body));
            *response.status_mut() = status;
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                content_type
                    .as_deref()
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(HeaderValue::from_static("application/json")),
            );
            response
        }
        ProxyOutcome::UpstreamError { status, body } => (
            status,
            Json(UpstreamErrorResponse {
                error: "SWARFARM API Error",
                message: upstream_body_as_json(&body),
            }),
        )
            .into_response(),
        ProxyOutcome::NetworkFailure { message } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ServiceUnavailableResponse {
                error: "Service Unavailable",
                message: "Could not reach SWARFARM API",
                details: message,
            }),
        )
            .into_response(),
    }
}

/// Upstream error bodies are usually JSON, but nothing guarantees it. Fall
/// back to carrying the raw body as a string so no information is dropped.
fn upstream_body_as_json(body: &[u8]) -> Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}
