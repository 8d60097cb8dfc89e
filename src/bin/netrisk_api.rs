//! NetRisk API Server
//!
//! REST API serving network risk analysis products
//!
//! Usage:
//!   cargo run --bin netrisk_api
//!
//! Environment:
//!   PORT / NETRISK_PORT - Server port (default: 8080)
//!   NETRISK_HOST        - Server host (default: 0.0.0.0)
//!   NETRISK_LOG_LEVEL   - Log level (default: info)
//!   NETRISK_DATA_DIR / NETRISK_SOURCE_URL - Snapshot source

use netrisk::api::{create_router, handlers::AppState, start_cleanup_task};
use netrisk::utils::constants::{APP_NAME, APP_VERSION};
use netrisk::{NetworkAnalyzer, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    let level = std::env::var("NETRISK_LOG_LEVEL")
        .ok()
        .and_then(|l| l.parse().ok())
        .unwrap_or(Level::INFO);
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    // Analyzer from env: source, thresholds, optional authoritative engine
    let analyzer = Arc::new(NetworkAnalyzer::from_env()?);
    let telemetry = analyzer.telemetry().clone();

    // Create app state
    let state = Arc::new(AppState::new(analyzer));

    // Start background cleanup task for rate limiter
    start_cleanup_task();
    info!("🧹 Background cleanup task started");

    // Create router
    let app = create_router(state);

    let server = ServerConfig::from_env();
    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;

    info!("🚀 {} API v{} starting on http://{}", APP_NAME, APP_VERSION, addr);
    info!("");
    info!("Endpoints:");
    info!("  GET  /v1/analysis           - Full analysis bundle");
    info!("  POST /v1/analyze            - Analyze a supplied snapshot");
    info!("  GET  /v1/patterns           - Behavioral pattern insights");
    info!("  GET  /v1/entities           - Scored entities (?pattern=&min_score=)");
    info!("  GET  /v1/districts/risk     - District risk (?districts=a,b)");
    info!("  GET  /v1/hotspots           - Hotspot ranking");
    info!("  GET  /v1/temporal           - Monthly and seasonal trends");
    info!("  GET  /v1/risk-distribution  - Entities per risk tier");
    info!("  GET  /v1/export             - JSON or CSV export (?format=)");
    info!("  GET  /v1/stats              - Run telemetry");
    info!("  GET  /v1/health             - Health check");
    info!("");
    info!(
        "Rate limit: {} requests per {}s",
        server.rate_limit_requests,
        server.rate_limit_window.as_secs()
    );
    info!("Press Ctrl+C for graceful shutdown");

    // Start server with graceful shutdown
    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("⚠️ Failed to listen for Ctrl+C: {}", e);
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    // Graceful shutdown sequence
    info!("");
    info!("🛑 Shutdown signal received, cleaning up...");

    info!("📊 Exporting final telemetry...");
    let stats = telemetry.get_stats();
    info!("   Total runs: {}", stats.total_runs);
    info!("   Authoritative runs: {}", stats.authoritative_runs);
    info!("   Fallbacks: {}", stats.fallbacks);
    info!("   Failed runs: {}", stats.failed_runs);

    match telemetry.export_stats_json() {
        Ok(path) => info!("   ✅ Stats exported to: {}", path.display()),
        Err(e) => warn!("   ⚠️ Failed to export stats: {}", e),
    }
    match telemetry.export_stats_csv() {
        Ok(path) => info!("   ✅ History appended to: {}", path.display()),
        Err(e) => warn!("   ⚠️ Failed to append history: {}", e),
    }

    info!("👋 NetRisk API shutdown complete");

    Ok(())
}
