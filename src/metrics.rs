//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::sync::Once;
use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Auth Metrics
    pub static ref SIGN_INS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ideaforge_sign_ins_total", "Total number of completed OAuth sign-ins"),
        &["provider"]
    ).expect("metric can be created");
    pub static ref USERS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "ideaforge_users_created_total",
        "Total number of users created through OAuth sign-in"
    ).expect("metric can be created");
    pub static ref SESSION_HYDRATIONS_TOTAL: IntCounter = IntCounter::new(
        "ideaforge_session_hydrations_total",
        "Total number of hydrated session reads"
    ).expect("metric can be created");

    // Credits Service Metrics
    pub static ref CREDITS_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ideaforge_credits_requests_total", "Total number of credits service requests"),
        &["operation", "status"]
    ).expect("metric can be created");
    pub static ref CREDITS_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "ideaforge_credits_request_duration_seconds",
            "Credits service request duration in seconds"
        ).buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["operation"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ideaforge_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; only the first call registers collectors.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(SIGN_INS_TOTAL.clone()))
            .expect("SIGN_INS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(USERS_CREATED_TOTAL.clone()))
            .expect("USERS_CREATED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(SESSION_HYDRATIONS_TOTAL.clone()))
            .expect("SESSION_HYDRATIONS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(CREDITS_REQUESTS_TOTAL.clone()))
            .expect("CREDITS_REQUESTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(CREDITS_REQUEST_DURATION_SECONDS.clone()))
            .expect("CREDITS_REQUEST_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}

/// Record the outcome of one credits service call.
pub fn observe_credits_request(operation: &str, status: &str, elapsed: Duration) {
    CREDITS_REQUESTS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
    CREDITS_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(elapsed.as_secs_f64());
}
