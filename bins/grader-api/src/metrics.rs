// Prometheus metrics for the grading endpoint
use grader_common::types::Verdict;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};

lazy_static! {
    pub static ref SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "grader_submissions_total",
        "Graded submissions by verdict",
        &["result"]
    )
    .expect("metric can be registered");
    pub static ref GRADING_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "grader_grading_errors_total",
        "Grading requests rejected before a submission was stored",
        &["code"]
    )
    .expect("metric can be registered");
    pub static ref GRADING_DURATION_SECONDS: Histogram = register_histogram!(
        "grader_grading_duration_seconds",
        "Wall-clock time spent grading one submission",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]
    )
    .expect("metric can be registered");
}

pub fn record_verdict(verdict: Verdict, seconds: f64) {
    SUBMISSIONS_TOTAL.with_label_values(&[verdict.label()]).inc();
    GRADING_DURATION_SECONDS.observe(seconds);
}

pub fn record_rejection(code: &str) {
    GRADING_ERRORS_TOTAL.with_label_values(&[code]).inc();
}

/// Render the default registry in the Prometheus text format
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
