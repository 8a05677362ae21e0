mod index;
mod proxy;

pub use index::*;
pub use proxy::*;
pub use test::*;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

#[derive(Serialize)]
struct NotFoundResponse {
    error: &'static str,
    message: &'static str,
    examples: [&'static str; 4],
}

/// Handler for any path outside the proxy surface.
pub async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            error: "Not Found",
            message: "Endpoint not found. Use /swarfarm/* to proxy SWARFARM API v2 calls.",
            examples: [
                "/swarfarm/bestiary/",
                "/swarfarm/bestiary/?page=2",
                "/swarfarm/skills/",
                "/test",
            ],
        }),
    )
}
