//! A minimal reverse proxy gateway for the SWARFARM API.

mod forwarder;
mod http_client;
mod routes;

use anyhow::Result;
use axum::{Router, http::Method, routing::get};
use core::{net::SocketAddr, time::Duration};
use forwarder::Forwarder;
use http_client::{BuildHttpClientArgs, build_http_client};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{self, TraceLayer},
};
use tracing::{Level, info};
use url::Url;

#[derive(Debug)]
pub struct Server {
    router_inner: Router,
}

/// Settings to run the proxy server with.
#[derive(Debug, Clone)]
pub struct Settings {
    /// How long a request may take to be processed before it is abandoned
    /// and an error is sent to the client.
    pub request_timeout: Duration,

    /// See [`UpstreamSettings`].
    pub upstream_settings: UpstreamSettings,
}

/// Configuration options used when making any call to the upstream API.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    /// Root of the upstream API that all proxied requests are forwarded to.
    ///
    /// Fixed for the lifetime of the server; it never varies per request.
    pub base_url: Url,

    /// How long to wait for a request to the upstream to complete before it
    /// is abandoned and considered failed. This is the only deadline applied
    /// to the outbound exchange.
    pub request_timeout: Duration,
}

#[derive(Debug)]
struct AppState {
    forwarder: Forwarder,
    settings: Settings,
}

impl Server {
    /// Create a new server with the provided settings.
    pub fn new(settings: Settings) -> Result<Self> {
        let client = build_http_client(BuildHttpClientArgs {
            request_timeout: settings.upstream_settings.request_timeout,
        })?;

        // Note: no trailing-slash normalization here. The upstream API
        // distinguishes `bestiary` from `bestiary/`, so paths must reach the
        // Forwarder exactly as the client sent them.
        let router = Router::new()
            .route("/", get(routes::index_handler))
            .route("/test", get(routes::test_handler))
            .route("/swarfarm/", get(routes::proxy_root_handler))
            .route("/swarfarm/{*path}", get(routes::proxy_handler))
            .fallback(routes::not_found_handler)
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(TimeoutLayer::new(settings.request_timeout))
            .layer(CatchPanicLayer::new())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([Method::GET]),
            )
            .with_state(Arc::new(AppState {
                forwarder: Forwarder::new(client, settings.upstream_settings.base_url.clone()),
                settings,
            }));

        Ok(Self {
            router_inner: router,
        })
    }

    /// Start the server and expose it on the provided [`SocketAddr`].
    pub async fn start(self, address: &SocketAddr) -> Result<()> {
        let tcp_listener = TcpListener::bind(&address).await?;
        info!("Listening on http://{}", tcp_listener.local_addr()?);
        axum::serve(tcp_listener, self.router_inner)
            .with_graceful_shutdown(async {
                signal::ctrl_c().await.expect("failed to listen for ctrl-c");
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn test_router(base_url: &str) -> Router {
        test_router_with_upstream_timeout(base_url, Duration::from_secs(2))
    }

    fn test_router_with_upstream_timeout(base_url: &str, upstream_timeout: Duration) -> Router {
        Server::new(Settings {
            request_timeout: Duration::from_secs(5),
            upstream_settings: UpstreamSettings {
                base_url: Url::parse(base_url).unwrap(),
                request_timeout: upstream_timeout,
            },
        })
        .unwrap()
        .router_inner
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    // Upstream that refuses connections outright: port 9 (discard) is
    // reserved and nothing listens on it locally.
    const UNREACHABLE_UPSTREAM: &str = "http://127.0.0.1:9/api/v2/";

    #[tokio::test]
    async fn success_responses_pass_through_unmodified() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/bestiary/"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 5})))
            .mount(&upstream)
            .await;

        let router = test_router(&format!("{}/api/v2/", upstream.uri()));
        let (status, body) = get_json(router, "/swarfarm/bestiary/?page=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"count": 5}));
    }

    #[tokio::test]
    async fn empty_path_suffix_hits_the_upstream_root() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"bestiary": "ok"})))
            .mount(&upstream)
            .await;

        let router = test_router(&format!("{}/api/v2/", upstream.uri()));
        let (status, body) = get_json(router, "/swarfarm/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"bestiary": "ok"}));
    }

    #[tokio::test]
    async fn upstream_errors_keep_their_status_and_body() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/bestiary/99999/"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
            .mount(&upstream)
            .await;

        let router = test_router(&format!("{}/api/v2/", upstream.uri()));
        let (status, body) = get_json(router, "/swarfarm/bestiary/99999/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "SWARFARM API Error");
        assert_eq!(body["message"]["detail"], "Not found.");
    }

    #[tokio::test]
    async fn non_json_upstream_error_bodies_are_carried_as_strings() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/skills/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&upstream)
            .await;

        let router = test_router(&format!("{}/api/v2/", upstream.uri()));
        let (status, body) = get_json(router, "/swarfarm/skills/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "upstream exploded");
    }

    #[tokio::test]
    async fn unreachable_upstream_maps_to_service_unavailable() {
        let router = test_router(UNREACHABLE_UPSTREAM);
        let (status, body) = get_json(router, "/swarfarm/skills/").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Service Unavailable");
        assert_eq!(body["message"], "Could not reach SWARFARM API");
        assert!(!body["details"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upstream_timeout_maps_to_service_unavailable() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/skills/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&upstream)
            .await;

        let router = test_router_with_upstream_timeout(
            &format!("{}/api/v2/", upstream.uri()),
            Duration::from_millis(200),
        );
        let (status, body) = get_json(router, "/swarfarm/skills/").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body["details"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_paths_return_not_found_with_examples() {
        let router = test_router(UNREACHABLE_UPSTREAM);
        let (status, body) = get_json(router, "/unknown/path").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");
        assert!(body["examples"].as_array().unwrap().len() >= 1);
    }

    #[tokio::test]
    async fn index_describes_the_service() {
        let router = test_router(UNREACHABLE_UPSTREAM);
        let (status, body) = get_json(router, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["api_base"], UNREACHABLE_UPSTREAM);
        assert!(body["status"].as_str().unwrap().contains("running"));
    }

    #[tokio::test]
    async fn test_endpoint_reports_upstream_listing() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"bestiary": "/bestiary/"})),
            )
            .mount(&upstream)
            .await;

        let router = test_router(&format!("{}/api/v2/", upstream.uri()));
        let (status, body) = get_json(router, "/test").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["available_endpoints"]["bestiary"], "/bestiary/");
    }

    #[tokio::test]
    async fn test_endpoint_reports_unreachable_upstream() {
        let router = test_router(UNREACHABLE_UPSTREAM);
        let (status, body) = get_json(router, "/test").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Cannot reach SWARFARM API");
    }
}
