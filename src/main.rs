mod clock;
mod config;
mod error;
mod geoid;
mod handlers;
mod metrics;
mod models;
mod rate_limit;
mod state;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use crate::config::{Args, ConfigError};
use crate::geoid::GeoidClient;
use crate::rate_limit::{RateLimiter, expiry_sweeper};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geoid_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // parse cli arguments, with .env from the working directory as a fallback
    let args = match Args::load_from(Path::new(".env"), std::env::args_os()) {
        Ok(args) => args,
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => return Err(e.into()),
    };

    let geoid = GeoidClient::new(&args.upstream_url, Duration::from_secs(args.upstream_timeout))?;
    tracing::info!("Looking up heights at {}", geoid.url());
    let rate_limiter = Arc::new(RateLimiter::new(
        args.request_limit,
        Duration::from_secs(args.request_window),
    ));

    // creating shared state
    let state = Arc::new(AppState {
        geoid,
        rate_limiter: Arc::clone(&rate_limiter),
    });

    // entries are kept forever unless the sweeper is turned on
    if args.sweep_interval > 0 {
        tokio::spawn(expiry_sweeper(rate_limiter, Duration::from_secs(args.sweep_interval)));
    }

    let app = handlers::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Gateway running on http://{}", listener.local_addr()?);
    tracing::info!(
        "Rate limit: {} requests per {} seconds",
        args.request_limit,
        args.request_window
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
