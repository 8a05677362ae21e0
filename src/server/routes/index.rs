use crate::server::AppState;
use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct IndexResponse {
    status: &'static str,
    usage: &'static str,
    example: &'static str,
    api_base: String,
}

/// Static informational payload describing the service and example usage.
pub async fn index_handler(State(state): State<Arc<AppState>>) -> Json<IndexResponse> {
    Json(IndexResponse {
        status: "SWARFARM Proxy Server is running!",
        usage: "Use /swarfarm/* to proxy requests to SWARFARM API v2",
        example: "/swarfarm/bestiary/",
        api_base: state.settings.upstream_settings.base_url.to_string(),
    })
}
