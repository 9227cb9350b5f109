use std::net::SocketAddr;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use photo_analysis_engine::commands;
use photo_analysis_engine::config::AppConfig;
use photo_analysis_engine::services::engine::JobEngine;
use photo_analysis_engine::services::provider::{ProviderClient, WorkersAiClient};
use photo_analysis_engine::services::storage::R2Client;

#[tokio::main]
async fn main() {
    // Initialize structured logging (stdout carries replies, so logs go to stderr)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing photo analysis engine");

    // Initialize Prometheus metrics exporter with its own scrape listener
    let metrics_addr: SocketAddr = config
        .metrics_addr
        .parse()
        .expect("METRICS_ADDR must be a socket address");
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .expect("Failed to install Prometheus metrics exporter");

    metrics::describe_counter!(
        "analysis_jobs_submitted_total",
        "Total analysis jobs submitted"
    );
    metrics::describe_counter!(
        "analysis_cache_hits_total",
        "Submissions answered from the response cache"
    );
    metrics::describe_counter!(
        "analysis_provider_calls_total",
        "Calls made to the AI provider"
    );
    metrics::describe_counter!(
        "analysis_jobs_completed_total",
        "Total analysis jobs completed"
    );
    metrics::describe_counter!(
        "analysis_jobs_failed_total",
        "Total analysis jobs that failed"
    );
    metrics::describe_counter!(
        "analysis_jobs_retried_total",
        "Analysis attempts rescheduled after a transient failure"
    );
    metrics::describe_histogram!(
        "analysis_processing_seconds",
        "Time to process an analysis job attempt"
    );
    metrics::describe_gauge!(
        "analysis_cache_entries",
        "Current number of cached analysis results"
    );

    // Initialize Workers AI client
    let provider: Option<Arc<dyn ProviderClient>> = match config.provider_credentials() {
        Some((account_id, api_token)) => {
            tracing::info!(model = %config.cf_model, "Initializing Cloudflare Workers AI client");
            Some(Arc::new(WorkersAiClient::new(
                account_id,
                api_token,
                &config.cf_model,
            )))
        }
        None => {
            tracing::warn!("Workers AI credentials missing, analysis submissions will be rejected");
            None
        }
    };

    // Initialize R2 photo storage
    tracing::info!("Initializing R2 storage client");
    let photos = R2Client::new(
        config.r2_bucket.as_deref().expect("R2_BUCKET is required"),
        config.r2_endpoint.as_deref().expect("R2_ENDPOINT is required"),
        config.r2_access_key.as_deref().expect("R2_ACCESS_KEY is required"),
        config.r2_secret_key.as_deref().expect("R2_SECRET_KEY is required"),
    )
    .expect("Failed to initialize R2 client");

    let engine = JobEngine::new(config.engine_config(), provider, Arc::new(photos));
    let maintenance = engine.spawn_maintenance();

    tracing::info!(metrics_addr = %metrics_addr, "Engine ready, reading commands from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received interrupt, shutting down");
                break;
            }
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read command");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = commands::handle_line(&engine, &line);
        let mut encoded = serde_json::to_vec(&reply).expect("Reply is always serializable");
        encoded.push(b'\n');
        if let Err(e) = stdout.write_all(&encoded).await {
            tracing::error!(error = %e, "Failed to write reply");
            break;
        }
        let _ = stdout.flush().await;
    }

    maintenance.shutdown().await;
    tracing::info!("Photo analysis engine stopped");
}
