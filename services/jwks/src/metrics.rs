//! Prometheus metrics for the JWKS service.
//!
//! Counters are registered in the default registry on first use and
//! exposed in text format by [`gather`].

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_int_counter, CounterVec, Encoder, IntCounter, TextEncoder};

/// Tokens issued counter.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "jwks_service_tokens_issued_total",
        "Total number of tokens issued",
        &["freshness", "algorithm"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Requests refused by the issuance rate limiter.
pub static RATE_LIMITED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "jwks_service_rate_limited_total",
        "Total number of /auth requests refused by the rate limiter"
    )
    .expect("Failed to register rate_limited metric")
});

/// JWKS documents served.
pub static JWKS_SERVED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "jwks_service_jwks_requests_total",
        "Total number of JWKS documents served"
    )
    .expect("Failed to register jwks_requests metric")
});

/// Registration attempts counter.
pub static REGISTRATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "jwks_service_registrations_total",
        "Total number of registration attempts",
        &["status"]
    )
    .expect("Failed to register registrations metric")
});

/// Key pool operations counter.
pub static KEY_OPERATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "jwks_service_key_operations_total",
        "Total number of signing key operations",
        &["operation", "freshness"]
    )
    .expect("Failed to register key_operations metric")
});

/// Record a token issuance.
pub fn record_token_issued(freshness: &str, algorithm: &str) {
    TOKENS_ISSUED
        .with_label_values(&[freshness, algorithm])
        .inc();
}

/// Record a rate-limit denial.
pub fn record_rate_limited() {
    RATE_LIMITED.inc();
}

/// Record a served JWKS document.
pub fn record_jwks_served() {
    JWKS_SERVED.inc();
}

/// Record a registration outcome.
pub fn record_registration(status: &str) {
    REGISTRATIONS.with_label_values(&[status]).inc();
}

/// Record a key pool operation.
pub fn record_key_operation(operation: &str, freshness: &str) {
    KEY_OPERATIONS
        .with_label_values(&[operation, freshness])
        .inc();
}

/// Render every registered metric in the Prometheus text format.
#[must_use]
pub fn gather() -> String {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_token_issued() {
        record_token_issued("expired", "RS256");
        let value = TOKENS_ISSUED
            .with_label_values(&["expired", "RS256"])
            .get();
        assert!(value > 0.0);
    }

    #[test]
    fn test_record_rate_limited() {
        let before = RATE_LIMITED.get();
        record_rate_limited();
        assert!(RATE_LIMITED.get() > before);
    }

    #[test]
    fn test_gather_includes_registered_counters() {
        record_registration("created");
        let text = gather();
        assert!(text.contains("jwks_service_registrations_total"));
    }
}
