mod server;

use anyhow::Result;
use clap::Parser;
use core::net::{IpAddr, SocketAddr};
use dotenvy::dotenv;
use server::{Server, Settings, UpstreamSettings};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(author, version, about, long_about)]
struct Arguments {
    /// Port that the server should listen on.
    #[arg(long = "port", env = "PORT", default_value_t = 3000)]
    port: u16,

    /// IP address that the server should bind to.
    #[arg(
        long = "bind-address",
        env = "BIND_ADDRESS",
        default_value = "0.0.0.0"
    )]
    bind_address: IpAddr,

    /// Maximum waiting time before incoming requests are aborted.
    #[arg(
        long = "request-timeout",
        env = "REQUEST_TIMEOUT",
        default_value = "60s"
    )]
    request_timeout: humantime::Duration,

    /// Root URL of the upstream API that all proxied requests are forwarded to.
    #[arg(
        long = "upstream-url",
        env = "UPSTREAM_URL",
        default_value = "https://swarfarm.com/api/v2/"
    )]
    upstream_url: Url,

    /// Maximum waiting time before requests to the upstream are aborted.
    #[arg(
        long = "upstream-request-timeout",
        env = "UPSTREAM_REQUEST_TIMEOUT",
        default_value = "30s"
    )]
    upstream_request_timeout: humantime::Duration,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("info")))
        .init();
    let args = Arguments::parse();

    Server::new(Settings {
        request_timeout: args.request_timeout.into(),
        upstream_settings: UpstreamSettings {
            base_url: args.upstream_url,
            request_timeout: args.upstream_request_timeout.into(),
        },
    })?
    .start(&SocketAddr::new(args.bind_address, args.port))
    .await
}
