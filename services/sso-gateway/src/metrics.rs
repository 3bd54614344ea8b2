//! Prometheus metrics exposition
//!
//! - `sso_token_exchanges_total` (counter): labels `grant`, `outcome`
//! - `sso_affiliation_lookups_total` (counter): label `outcome`
//! - `sso_login_duration_seconds` (histogram): callback handling time

use eve_sso::Error;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

fn builder() -> PrometheusBuilder {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("sso_login_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .expect("failed to set histogram buckets")
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> PrometheusHandle {
    builder()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Label for a token endpoint result.
pub fn outcome_label<T>(result: &Result<T, Error>) -> &'static str {
    match result {
        Ok(_) => "issued",
        Err(Error::Protocol { .. }) => "rejected",
        Err(Error::EmptyToken) => "empty",
        Err(Error::Http(_)) => "transport",
        Err(Error::Parse { .. }) => "malformed",
        Err(Error::Config(_)) => "config",
    }
}

pub fn record_token_exchange(grant: &str, outcome: &str) {
    metrics::counter!(
        "sso_token_exchanges_total",
        "grant" => grant.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_affiliation(resolved: bool) {
    let outcome = if resolved { "resolved" } else { "missing" };
    metrics::counter!("sso_affiliation_lookups_total", "outcome" => outcome).increment(1);
}

pub fn record_login_duration(duration_secs: f64) {
    metrics::histogram!("sso_login_duration_seconds").record(duration_secs);
}
