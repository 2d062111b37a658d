use crate::api::{handlers, AppState};
use crate::metrics::track_http_metrics;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    let timeout = state.request_timeout;
    let metrics_enabled = state.metrics_enabled;

    let mut router = Router::new()
        // Service info and health
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        // Risk prediction
        .route("/predict", post(handlers::predict))
        .route("/predict/batch", post(handlers::predict_batch))
        // Patient registry
        .route(
            "/patients",
            post(handlers::create_patient).get(handlers::list_patients),
        )
        .route(
            "/patients/:id",
            get(handlers::get_patient)
                .put(handlers::update_patient)
                .delete(handlers::delete_patient),
        )
        // Model introspection
        .route("/model", get(handlers::model_info));

    if metrics_enabled {
        router = router
            .route("/metrics", get(handlers::metrics))
            .route_layer(middleware::from_fn(track_http_metrics));
    }

    router
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
