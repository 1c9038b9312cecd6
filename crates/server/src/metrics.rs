use axum::http::StatusCode;
use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder,
};
use service::loan::LoanError;

// Prometheus metrics (default registry)
pub static LOANS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("loan_api_loans_created_total", "Total loan applications registered")
        .expect("register loans_created_total")
});

pub static STATUS_CHANGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "loan_api_status_changes_total",
        "Total successful status transitions by target status",
        &["to"]
    )
    .expect("register status_changes_total")
});

pub static DOMAIN_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "loan_api_domain_errors_total",
        "Total business rule rejections by kind",
        &["kind"]
    )
    .expect("register domain_errors_total")
});

pub static HTTP_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "loan_api_http_errors_total",
        "Total error responses by status code",
        &["status"]
    )
    .expect("register http_errors_total")
});

pub fn error_kind(err: &LoanError) -> &'static str {
    match err {
        LoanError::DuplicateDocument(_) => "duplicate_document",
        LoanError::NotFound(_) => "not_found",
        LoanError::InvalidTransition { .. } => "invalid_transition",
        LoanError::Repository(_) => "repository",
    }
}

pub fn encode_metrics() -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}"));
    }
    (StatusCode::OK, String::from_utf8(buffer).unwrap_or_default())
}

pub async fn metrics_handler() -> (StatusCode, String) {
    encode_metrics()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        LOANS_CREATED_TOTAL.inc();
        STATUS_CHANGES_TOTAL.with_label_values(&["APPROVED"]).inc();
        let (status, body) = encode_metrics();
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("loan_api_loans_created_total"));
        assert!(body.contains("loan_api_status_changes_total{to=\"APPROVED\"}"));
    }
}
