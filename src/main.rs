//! NetRisk - one-shot network risk analysis
//!
//! Reads a snapshot from a directory of `<collection>.json` files or a REST
//! source, runs one analysis, and writes `analysis.json` and `entities.csv`.
//!
//! Usage:
//!   netrisk [SOURCE] [OUTPUT_DIR]
//!
//! SOURCE is a directory or an http(s) base URL; without it the source comes
//! from NETRISK_SOURCE_URL / NETRISK_DATA_DIR. OUTPUT_DIR defaults to
//! NETRISK_OUTPUT_DIR or `./output`.

use netrisk::models::SourceConfig;
use netrisk::providers::{connect, HttpAuthoritative};
use netrisk::utils::constants::{APP_NAME, APP_VERSION};
use netrisk::{export, AnalysisTelemetry, EngineConfig, ExportFormat, NetworkAnalyzer};

use chrono::Utc;
use eyre::{Result, WrapErr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

fn log_level() -> Level {
    std::env::var("NETRISK_LOG_LEVEL")
        .ok()
        .and_then(|l| l.parse().ok())
        .unwrap_or(Level::INFO)
}

fn source_from_arg(arg: Option<String>) -> SourceConfig {
    match arg {
        Some(s) if s.starts_with("http://") || s.starts_with("https://") => SourceConfig::Http(s),
        Some(dir) => SourceConfig::Directory(dir),
        None => SourceConfig::from_env(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let mut args = std::env::args().skip(1);
    let source_config = source_from_arg(args.next());
    let output_dir = args
        .next()
        .or_else(|| std::env::var("NETRISK_OUTPUT_DIR").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("output"));

    let config = EngineConfig::from_env();
    info!("🛰️ {} v{}", APP_NAME, APP_VERSION);
    info!("🔧 Source: {:?}", source_config);
    info!("   Activity threshold: {}", config.activity_threshold);
    info!("   Rapid expansion threshold: {}", config.rapid_expansion_threshold);
    info!("   Hotspot limit: {}", config.hotspot_limit);

    let source = connect(&source_config, config.fetch_timeout)?;
    let telemetry = Arc::new(AnalysisTelemetry::with_export_dir(output_dir.join("telemetry")));
    let mut analyzer = NetworkAnalyzer::new(source, config.clone())?.with_telemetry(telemetry.clone());
    if let Some(url) = &config.authoritative_url {
        info!("📡 Authoritative engine: {}", url);
        analyzer = analyzer.with_authoritative(Arc::new(HttpAuthoritative::new(
            url.clone(),
            config.authoritative_timeout,
        )?));
    }

    let bundle = analyzer.analyze(Utc::now(), None).await?;

    info!("");
    info!("📊 Run {} ({:?})", bundle.run_id, bundle.source);
    info!("   Entities scored: {}", bundle.detailed_entities.len());
    for insight in &bundle.pattern_insights {
        info!(
            "   {}: {} entities, avg score {}",
            insight.behavioral_pattern, insight.entity_count, insight.ai_risk_score
        );
    }
    info!(
        "   Critical entities (>= {}): {}",
        config.critical_min_score,
        bundle.critical_entities(config.critical_min_score).len()
    );
    info!(
        "   Districts: {} ({} high risk)",
        bundle.district_risk.summary.total_districts, bundle.district_risk.summary.high_risk_districts
    );
    for hotspot in &bundle.hotspots.hotspots {
        info!(
            "   🔥 {} [{:?}] score {}",
            hotspot.district_name, hotspot.alert_level, hotspot.hotspot_score
        );
    }
    for warning in &bundle.warnings {
        warn!("   ⚠️ [{}] {}", warning.code, warning.message);
    }

    std::fs::create_dir_all(&output_dir)
        .wrap_err_with(|| format!("creating {}", output_dir.display()))?;
    for (format, name) in [(ExportFormat::Json, "analysis"), (ExportFormat::Csv, "entities")] {
        let path = output_dir.join(format!("{}.{}", name, format.extension()));
        std::fs::write(&path, export(&bundle, format)?)
            .wrap_err_with(|| format!("writing {}", path.display()))?;
        info!("💾 Wrote {}", path.display());
    }

    if let Err(e) = telemetry.export_stats_json() {
        warn!("⚠️ Failed to export telemetry: {}", e);
    }
    if let Err(e) = telemetry.export_stats_csv() {
        warn!("⚠️ Failed to append telemetry history: {}", e);
    }

    Ok(())
}
