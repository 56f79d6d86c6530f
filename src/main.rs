use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use narrator::{config::AppConfig, routes, scrape, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "narrator=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    // ── Config ───────────────────────────────────────────────────────────────
    let config = AppConfig::from_env()?;
    let config = Arc::new(config);
    info!(
        "Starting narrator, binding to {} (upstream {})",
        config.bind, config.base_url
    );

    // ── Upstream client ──────────────────────────────────────────────────────
    let client = scrape::build_client(&config)?;

    // ── Application state ────────────────────────────────────────────────────
    let state = AppState {
        config: Arc::clone(&config),
        client,
    };

    // ── HTTP server ──────────────────────────────────────────────────────────
    let router = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Listening on http://{}", config.bind);

    axum::serve(listener, router).await?;

    Ok(())
}
