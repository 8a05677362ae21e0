use super::http_client::HttpClient;
use bytes::Bytes;
use reqwest::{StatusCode, header};
use tracing::{info, warn};
use url::{Url, form_urlencoded};

/// A single inbound proxy request in normalized form: the portion of the
/// request path after the proxy prefix and the query pairs in their original
/// order.
///
/// The path suffix never contains the proxy prefix itself and may be empty,
/// in which case the upstream API root is targeted.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest {
    pub path_suffix: String,
    pub query: Vec<(String, String)>,
}

/// The result of forwarding one request to the upstream. Exactly one variant
/// is produced per request.
#[derive(Debug)]
pub enum ProxyOutcome {
    /// The upstream answered with a success status; the body passes through
    /// untouched.
    Success {
        status: StatusCode,
        content_type: Option<String>,
        body: Bytes,
    },

    /// The upstream completed the exchange but reported failure. Status and
    /// body are preserved so the caller keeps the upstream's semantics.
    UpstreamError { status: StatusCode, body: Bytes },

    /// The exchange never produced an upstream status code (DNS failure,
    /// connection refused, timeout, TLS failure).
    NetworkFailure { message: String },
}

/// Translates inbound requests into upstream calls and normalizes the result.
///
/// A single attempt is made per call; retrying is left entirely to the
/// original client, as a retry here could double up non-idempotent upstream
/// side effects.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: HttpClient,
    base_url: Url,
}

impl Forwarder {
    pub fn new(client: HttpClient, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Build the upstream URL for a request.
    ///
    /// The path suffix is appended verbatim (the upstream validates its own
    /// paths, nothing is sanitized locally) and the query pairs are
    /// re-encoded in order. No `?` is appended when the query is empty.
    pub fn target_url(&self, request: &IncomingRequest) -> String {
        let mut url = format!("{}{}", self.base_url, request.path_suffix);
        if !request.query.is_empty() {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&request.query)
                .finish();
            url.push('?');
            url.push_str(&encoded);
        }
        url
    }

    /// Forward a request to the upstream and normalize the result.
    pub async fn forward(&self, request: IncomingRequest) -> ProxyOutcome {
        let url = self.target_url(&request);
        info!("Proxying to upstream: {url}");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("Failed to reach upstream: {err}");
                return ProxyOutcome::NetworkFailure {
                    message: err.to_string(),
                };
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                warn!("Failed to read upstream response body: {err}");
                return ProxyOutcome::NetworkFailure {
                    message: err.to_string(),
                };
            }
        };

        if status.is_success() {
            ProxyOutcome::Success {
                status,
                content_type,
                body,
            }
        } else {
            ProxyOutcome::UpstreamError { status, body }
        }
    }
}
