// HTTP route handlers for the grader API

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use grader_common::types::{GradeRequest, Submission, Verdict};
use grader_core::GradingError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::error::ApiError;
use crate::metrics;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: i64,
    pub result: Verdict,
    pub output: String,
    pub submitted_at: DateTime<Utc>,
}

/// Submission as shown in a user's history; the code itself is omitted
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionSummary {
    pub id: i64,
    pub problem_id: i64,
    pub result: Verdict,
    pub output: String,
    pub submitted_at: DateTime<Utc>,
}

impl From<Submission> for SubmissionSummary {
    fn from(s: Submission) -> Self {
        Self {
            id: s.id,
            problem_id: s.problem_id,
            result: s.result,
            output: s.output,
            submitted_at: s.submitted_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub stdin: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunResponse {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub timed_out: bool,
}

fn rejection_code(err: &GradingError) -> &'static str {
    match err {
        GradingError::Validation(_) => "validation",
        GradingError::NotFound(_) => "not_found",
        GradingError::NoTestCases(_) => "no_test_cases",
        GradingError::Store(_) => "store",
    }
}

/// POST /submit - Grade a submission synchronously
pub async fn submit(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GradeRequest>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;

    let start = Instant::now();
    match state.grader.grade(&request).await {
        Ok(submission) => {
            metrics::record_verdict(submission.result, start.elapsed().as_secs_f64());
            info!(
                submission_id = submission.id,
                user_id = submission.user_id,
                problem_id = submission.problem_id,
                verdict = %submission.result,
                "Submission processed"
            );
            Ok(Json(SubmitResponse {
                id: submission.id,
                result: submission.result,
                output: submission.output,
                submitted_at: submission.submitted_at,
            }))
        }
        Err(e) => {
            metrics::record_rejection(rejection_code(&e));
            info!(error = %e, "Submission rejected");
            Err(e.into())
        }
    }
}

/// GET /submissions/:user_id - A user's submissions, newest first
pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<SubmissionSummary>>, ApiError> {
    let submissions = state
        .grader
        .store()
        .list_submissions(user_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(submissions.into_iter().map(SubmissionSummary::from).collect()))
}

/// POST /execute - Run code once without grading
pub async fn execute(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Json<RunResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    if request.code.trim().is_empty() {
        return Err(ApiError::Validation("code must not be empty".to_string()));
    }

    let result = state.grader.run(&request.code, &request.stdin).await?;
    info!(
        exit_status = ?result.exit_status,
        timed_out = result.timed_out,
        duration_ms = result.duration_ms,
        "Code executed"
    );

    Ok(Json(RunResponse {
        success: result.success(),
        timed_out: result.timed_out,
        stdout: result.stdout,
        stderr: result.stderr,
    }))
}

/// GET /health - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus scrape endpoint
pub async fn metrics_endpoint() -> impl IntoResponse {
    match metrics::render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
