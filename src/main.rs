use anyhow::Context;
use diabetic_risk_service::{
    api::{build_router, AppState},
    config::{Config, ModelConfig, ObservabilityConfig, ServerConfig, TrainingConfig},
    metrics,
    ml::PredictionService,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        default_config()
    });

    init_tracing(&config.observability);

    tracing::info!(
        "Starting Diabetic Risk Service v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize Prometheus metrics
    let metrics_enabled = config.observability.prometheus_enabled;
    if metrics_enabled {
        if let Err(e) = metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("Prometheus metrics initialized");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    // Load the trained model once; every request shares it
    let artifact_path = config.model.artifact_path.clone();
    let predictions = tokio::task::spawn_blocking(move || PredictionService::load(artifact_path))
        .await
        .context("model loading task panicked")?;
    if !predictions.is_model_loaded() {
        tracing::warn!("Run `drs-cli train` to produce a model artifact");
    }

    let app_state = AppState::new(Arc::new(predictions))
        .with_max_batch_size(config.server.max_batch_size)
        .with_request_timeout(Duration::from_secs(config.server.request_timeout_secs))
        .with_metrics(metrics_enabled);

    let app = build_router(app_state);

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("failed to bind {}", http_addr))?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Predict: POST http://{}/predict", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(http_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

fn init_tracing(observability: &ObservabilityConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "diabetic_risk_service={},tower_http=info",
            observability.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn default_config() -> Config {
    Config {
        server: ServerConfig {
            host: "0.0.0.0".to_string(),
            http_port: 5000,
            request_timeout_secs: 30,
            max_batch_size: 1000,
        },
        model: ModelConfig {
            artifact_path: "models/random_forest_model.bin".to_string(),
        },
        training: TrainingConfig::default(),
        observability: ObservabilityConfig {
            log_level: "info".to_string(),
            json_logs: false,
            prometheus_enabled: true,
        },
    }
}
