use axum::{
    Router,
    extract::State,
    http::header,
    response::{IntoResponse, Json},
    routing::get,
};
use logship_observability::IngestMetrics;
use logship_observability::prometheus_exporter::content_type;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info};

pub fn router(metrics: Arc<IngestMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<Arc<IngestMetrics>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, content_type())], metrics.render())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Serve `/metrics` and `/health` on a dedicated tokio thread so the
/// ingestion loop never shares a runtime with HTTP traffic.
pub fn spawn(
    addr: String,
    metrics: Arc<IngestMetrics>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("logship-metrics".to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!(error = %e, "Failed to build runtime for metrics endpoint");
                    return;
                }
            };

            rt.block_on(async move {
                let listener = match tokio::net::TcpListener::bind(&addr).await {
                    Ok(l) => l,
                    Err(e) => {
                        error!(error = %e, addr = %addr, "Metrics endpoint failed to bind");
                        return;
                    }
                };
                info!(addr = %addr, "Metrics endpoint listening");
                if let Err(e) = axum::serve(listener, router(metrics)).await {
                    error!(error = %e, "Metrics endpoint stopped");
                }
            });
        })
}
