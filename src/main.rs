//! Newsdesk binary entry point

use newsdesk::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging, then validate the configuration
/// 3. Initialize metrics
/// 4. Initialize AppState
/// 5. Build Axum router
/// 6. Start HTTP server
/// 7. Start background tasks (crawler schedule)
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration
    let config = config::AppConfig::read()?;

    // 2. Initialize tracing/logging; RUST_LOG wins over logging.level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.default_directive().into());

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting Newsdesk...");
    config.validate()?;
    tracing::info!(
        domain = %config.server.domain,
        protocol = %config.server.protocol,
        backend = %config.backend.url,
        "Configuration loaded"
    );

    // 3. Initialize metrics
    newsdesk::metrics::init_metrics();

    // 4. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 5. Build Axum router
    let app = newsdesk::build_router(state.clone());

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Public URL: {}", config.server.base_url());

    // 7. Start background tasks
    if config.sync.enabled {
        spawn_sync_task(state.clone());
    }

    axum::serve(listener, app).await?;

    Ok(())
}

/// Spawn the scheduled crawler task
fn spawn_sync_task(state: AppState) {
    let Some(crawler) = state.crawler.clone() else {
        tracing::warn!("sync.enabled is set but no service role key is configured; skipping");
        return;
    };

    tokio::spawn(async move {
        let configured_interval_secs = state.config.sync.interval_seconds;
        let interval_secs = configured_interval_secs.max(1);
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

        if configured_interval_secs == 0 {
            tracing::warn!("sync.interval_seconds=0 is invalid; clamped to 1 second");
        }

        loop {
            interval.tick().await;

            tracing::info!("Running scheduled news sync...");
            let Some(reports) = crawler.sync().await else {
                continue;
            };
            let inserted: usize = reports.iter().map(|r| r.inserted).sum();
            let failed = reports.iter().filter(|r| r.error.is_some()).count();
            tracing::info!(
                sources = reports.len(),
                failed_sources = failed,
                inserted,
                "News sync completed"
            );
        }
    });

    tracing::info!("News sync task spawned");
}
