use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use tracing::{error, info};

lazy_static::lazy_static! {
    pub static ref METRICS: Metrics = Metrics::new();
}

pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_FAILURE: &str = "failure";
pub const RESULT_PASS: &str = "pass";
pub const RESULT_FAIL: &str = "fail";

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token metrics
    pub token_generation_requests: IntCounterVec,
    pub token_generation_duration: Histogram,
    pub token_refresh_skipped: IntCounter,

    // Validation metrics
    pub checks: IntCounterVec,
    pub responses: IntCounterVec,
    pub business_errors: IntCounterVec,

    // Data / correlation metrics
    pub data_exhaustions: IntCounterVec,
    pub correlation_failures: IntCounterVec,

    // Error log
    pub error_records: IntCounterVec,

    // Config
    pub config_validation_errors: IntCounter,
}

impl Metrics {
    fn new() -> Self {
        info!("Initializing Metrics ...");
        let registry = Registry::new_custom(Some("loadtestkit".into()), None).unwrap();

        let metrics = Self {
            // Token
            token_generation_requests: IntCounterVec::new(Opts::new("token_generation_requests_total", "Token generation attempts by outcome"), &["outcome"]).unwrap(),
            token_generation_duration: Histogram::with_opts(HistogramOpts::new("token_generation_duration_seconds", "Token generation duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])).unwrap(),
            token_refresh_skipped: IntCounter::new("token_refresh_skipped_total", "Refreshes skipped because another refresh was in flight").unwrap(),

            // Validation
            checks: IntCounterVec::new(Opts::new("checks_total", "Response checks by api, check and result"), &["api", "check", "result"]).unwrap(),
            responses: IntCounterVec::new(Opts::new("responses_total", "Validated responses by api"), &["api"]).unwrap(),
            business_errors: IntCounterVec::new(Opts::new("business_errors_total", "Responses with a status outside 2xx by api"), &["api"]).unwrap(),

            // Data / correlation
            data_exhaustions: IntCounterVec::new(Opts::new("data_exhaustions_total", "Unique allocations past the end of a dataset"), &["dataset"]).unwrap(),
            correlation_failures: IntCounterVec::new(Opts::new("correlation_failures_total", "Required correlation values that did not resolve"), &["key"]).unwrap(),

            error_records: IntCounterVec::new(Opts::new("error_records_total", "Error records appended by kind"), &["kind"]).unwrap(),

            config_validation_errors: IntCounter::new("config_validation_errors_total", "Config parse/validation failures").unwrap(),

            registry,
        };

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_generation_requests.clone())).unwrap();
        reg.register(Box::new(metrics.token_generation_duration.clone())).unwrap();
        reg.register(Box::new(metrics.token_refresh_skipped.clone())).unwrap();
        reg.register(Box::new(metrics.checks.clone())).unwrap();
        reg.register(Box::new(metrics.responses.clone())).unwrap();
        reg.register(Box::new(metrics.business_errors.clone())).unwrap();
        reg.register(Box::new(metrics.data_exhaustions.clone())).unwrap();
        reg.register(Box::new(metrics.correlation_failures.clone())).unwrap();
        reg.register(Box::new(metrics.error_records.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();

        metrics
    }
}

/// Share of validated responses for `api` whose status fell outside 2xx.
pub fn business_error_rate(api: &str) -> f64 {
    let total = METRICS.responses.with_label_values(&[api]).get();
    if total == 0 {
        return 0.0;
    }
    METRICS.business_errors.with_label_values(&[api]).get() as f64 / total as f64
}

/// Prometheus text exposition of everything the kit recorded.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = METRICS.registry.gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("metrics encode failed: {}", err);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
