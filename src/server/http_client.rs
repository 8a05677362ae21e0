use anyhow::Result;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::time::Duration;

pub type HttpClient = reqwest::Client;

pub struct BuildHttpClientArgs {
    pub request_timeout: Duration,
}

/// Create a new [`HttpClient`] with the given arguments.
///
/// Every request carries an identifying User-Agent and asks the upstream for
/// JSON; both are fixed for the lifetime of the client.
pub fn build_http_client(args: BuildHttpClientArgs) -> Result<HttpClient> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    Ok(reqwest::ClientBuilder::default()
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .default_headers(default_headers)
        .connect_timeout(Duration::from_secs(5))
        .timeout(args.request_timeout)
        .build()?)
}
