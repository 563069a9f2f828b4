// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  logship: reverse-proxy access log → PostgreSQL
//
//  Pipeline:  tail (poll) → decode (schema table) → insert (one row)
//  Runtime:   single-threaded tokio; metrics on a separate thread
//  Config:    YAML file + DB_* / LOGSHIP_* environment
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod metrics_server;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use logship_core::{Decoder, Schema, ShipperConfig};
use logship_ingest::{IngestSettings, Ingestor};
use logship_observability::IngestMetrics;
use logship_store::{PgSink, RecordSink};
use logship_tail::TailReader;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "logship", version, about = "Ship reverse-proxy JSON access logs into PostgreSQL")]
struct Cli {
    /// Path to an optional YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Ensure the table exists and exit without tailing
    #[arg(long)]
    check: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ──
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }

    info!(version = env!("CARGO_PKG_VERSION"), "logship starting");

    // ── Config ──
    let config = ShipperConfig::load(cli.config.as_deref()).context("loading configuration")?;
    info!(
        db_host = %config.database.host,
        db_name = %config.database.name,
        table = %config.database.table,
        path = %config.tail.path.display(),
        schema = ?config.decode.schema,
        "Configuration loaded"
    );

    // ── Metrics ──
    let metrics = Arc::new(IngestMetrics::new(config.metrics.enabled)?);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    rt.block_on(run(config, metrics, cli.check))
}

async fn run(
    config: ShipperConfig,
    metrics: Arc<IngestMetrics>,
    check_only: bool,
) -> anyhow::Result<()> {
    let schema = Arc::new(Schema::for_variant(config.decode.schema));

    // ── Table (fatal on failure) ──
    let mut sink = PgSink::new(&config.database, &schema);
    sink.ensure_table().await.with_context(|| {
        format!(
            "ensuring table `{}` on {}:{}/{}",
            config.database.table, config.database.host, config.database.port, config.database.name
        )
    })?;

    if check_only {
        info!("Check passed, exiting");
        return Ok(());
    }

    // ── Source file (fatal on failure) ──
    let reader = TailReader::open(&config.tail.path).context("opening access log")?;

    if config.metrics.enabled {
        metrics_server::spawn(config.metrics.addr.clone(), Arc::clone(&metrics))
            .context("spawning metrics thread")?;
    }

    // ── Shutdown: SIGTERM (docker stop) + SIGINT (Ctrl+C) ──
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received, stopping after the current line");
        let _ = shutdown_tx.send(true);
    });

    let decoder = Decoder::new(schema, config.decode.strict);
    let mut ingestor = Ingestor::new(
        reader,
        sink,
        decoder,
        IngestSettings::from(&config.tail),
        metrics,
    );
    ingestor.run(shutdown_rx).await;

    info!("logship stopped");
    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
                return;
            }
            Err(e) => {
                warn!(error = %e, "Cannot install SIGTERM handler, only Ctrl+C stops logship")
            }
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
