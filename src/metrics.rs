//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("postwall_http_requests_total", "Total number of HTTP requests"),
        &["method", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "postwall_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["method"]
    ).expect("metric can be created");

    // Domain Metrics
    pub static ref POSTS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "postwall_posts_created_total",
        "Total number of posts created"
    ).expect("metric can be created");
    pub static ref COMMENTS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "postwall_comments_created_total",
        "Total number of comments created"
    ).expect("metric can be created");
    pub static ref GROUPS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "postwall_groups_created_total",
        "Total number of groups created"
    ).expect("metric can be created");
    pub static ref RELATION_TOGGLES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("postwall_relation_toggles_total", "Like/follow toggles by kind and action"),
        &["kind", "action"]
    ).expect("metric can be created");
    pub static ref ACTIVITY_UPDATES_TOTAL: IntCounter = IntCounter::new(
        "postwall_activity_updates_total",
        "Total number of last-seen writes"
    ).expect("metric can be created");
    pub static ref MEDIA_UPLOADS_TOTAL: IntCounter = IntCounter::new(
        "postwall_media_uploads_total",
        "Total number of media uploads"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("postwall_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: std::sync::Once = std::sync::Once::new();

/// Initialize metrics registry. Later calls are no-ops.
pub fn init_metrics() {
    INIT.call_once(register_all);
}

fn register_all() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("HTTP_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(POSTS_CREATED_TOTAL.clone()))
        .expect("POSTS_CREATED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(COMMENTS_CREATED_TOTAL.clone()))
        .expect("COMMENTS_CREATED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(GROUPS_CREATED_TOTAL.clone()))
        .expect("GROUPS_CREATED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(RELATION_TOGGLES_TOTAL.clone()))
        .expect("RELATION_TOGGLES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ACTIVITY_UPDATES_TOTAL.clone()))
        .expect("ACTIVITY_UPDATES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(MEDIA_UPLOADS_TOTAL.clone()))
        .expect("MEDIA_UPLOADS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

/// Record one finished HTTP request.
pub fn observe_http_request(method: &str, status: u16, elapsed: std::time::Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method])
        .observe(elapsed.as_secs_f64());
}

/// Middleware counting every request by method and status
pub async fn track_requests(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = request.method().as_str().to_owned();
    let started = std::time::Instant::now();
    let response = next.run(request).await;
    observe_http_request(&method, response.status().as_u16(), started.elapsed());
    response
}
