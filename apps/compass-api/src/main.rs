//! Legal Compass API Server
//!
//! Backend for the legal services marketplace. See the library crate for
//! the endpoint list.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;
use compass_api::{build_router, AppState, Config};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();
    let config = Config::parse();

    // Initialize logging
    let filter = if config.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env()
            .add_directive("compass_api=info".parse()?)
            .add_directive("tower_http=debug".parse()?)
    };
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!("Initializing Legal Compass API...");
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let rate_limit = config.rate_limit.max(1);

    let state = AppState::new(config).await?;
    state.ensure_admin().await?;
    let state = Arc::new(state);

    // Create rate limiter configuration
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(rate_limit.into())
            .burst_size(rate_limit * 2)
            .finish()
            .ok_or_else(|| anyhow!("invalid rate limit: {}", rate_limit))?,
    );

    let app = build_router(state).layer(GovernorLayer {
        config: governor_conf,
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Legal Compass API listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", rate_limit);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
