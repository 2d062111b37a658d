/// Prometheus metrics for the risk service.
///
/// Covers HTTP traffic, prediction outcomes per tier, calibrated score
/// distribution and whether a model is loaded. Everything lives in one
/// process-wide registry exported at `/metrics`.
///
/// # Example
/// ```no_run
/// use diabetic_risk_service::metrics::PREDICTIONS_TOTAL;
///
/// PREDICTIONS_TOTAL.with_label_values(&["high"]).inc();
/// ```

mod middleware;

pub use middleware::track_http_metrics;

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
};

const NAMESPACE: &str = "diabetic_risk";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // HTTP Metrics
    // ============================================================================

    /// Total number of HTTP requests received
    ///
    /// Labels: method, path, status_code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests")
            .namespace(NAMESPACE),
        &["method", "path", "status_code"]
    ).expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// HTTP request duration in seconds
    ///
    /// Labels: method, path
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["method", "path"]
    ).expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    // ============================================================================
    // Prediction Metrics
    // ============================================================================

    /// Total number of risk assessments served
    ///
    /// Labels: tier
    pub static ref PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("predictions_total", "Total number of risk assessments served")
            .namespace(NAMESPACE),
        &["tier"]
    ).expect("Failed to create PREDICTIONS_TOTAL metric");

    /// Total number of failed predictions
    ///
    /// Labels: code
    pub static ref PREDICTION_ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("prediction_errors_total", "Total number of failed predictions")
            .namespace(NAMESPACE),
        &["code"]
    ).expect("Failed to create PREDICTION_ERRORS_TOTAL metric");

    /// Time spent classifying and assessing one request (single or batch)
    pub static ref PREDICTION_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "prediction_duration_seconds",
            "Classifier inference plus risk assessment time in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
    ).expect("Failed to create PREDICTION_DURATION_SECONDS metric");

    /// Distribution of calibrated priority scores
    pub static ref PRIORITY_SCORE: Histogram = Histogram::with_opts(
        HistogramOpts::new("priority_score", "Calibrated 0-100 priority scores")
            .namespace(NAMESPACE)
            .buckets(vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0]),
    ).expect("Failed to create PRIORITY_SCORE metric");

    /// 1 when a trained model is loaded, 0 otherwise
    pub static ref MODEL_LOADED: Gauge = Gauge::with_opts(
        Opts::new("model_loaded", "Whether a trained model is loaded")
            .namespace(NAMESPACE)
    ).expect("Failed to create MODEL_LOADED metric");

    // ============================================================================
    // System Metrics
    // ============================================================================

    /// Application build info
    ///
    /// Labels: version
    pub static ref BUILD_INFO: GaugeVec = GaugeVec::new(
        Opts::new("build_info", "Application build information")
            .namespace(NAMESPACE),
        &["version"]
    ).expect("Failed to create BUILD_INFO metric");
}

fn register<C: prometheus::core::Collector + Clone + 'static>(
    collector: &C,
) -> Result<(), prometheus::Error> {
    match PROMETHEUS_REGISTRY.register(Box::new(collector.clone())) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    register(&*HTTP_REQUESTS_TOTAL)?;
    register(&*HTTP_REQUEST_DURATION_SECONDS)?;

    register(&*PREDICTIONS_TOTAL)?;
    register(&*PREDICTION_ERRORS_TOTAL)?;
    register(&*PREDICTION_DURATION_SECONDS)?;
    register(&*PRIORITY_SCORE)?;
    register(&*MODEL_LOADED)?;

    register(&*BUILD_INFO)?;
    BUILD_INFO
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .set(1.0);

    tracing::debug!("Prometheus metrics initialized");
    Ok(())
}

/// Prometheus text exposition of every registered metric
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
    }

    #[test]
    fn test_prediction_counter() {
        PREDICTIONS_TOTAL.with_label_values(&["medium"]).inc();
        assert!(PREDICTIONS_TOTAL.with_label_values(&["medium"]).get() >= 1.0);
    }

    #[test]
    fn test_gather_metrics() {
        init_metrics().unwrap();
        PREDICTIONS_TOTAL.with_label_values(&["low"]).inc();

        let metrics = gather_metrics();
        assert!(metrics.contains("diabetic_risk_predictions_total"));
        assert!(metrics.contains("diabetic_risk_build_info"));
    }
}
