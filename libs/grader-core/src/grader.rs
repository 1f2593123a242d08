//! Grading Orchestrator - Public Entry Point
//!
//! **Responsibility:**
//! Validate the request, load the problem's test cases, drive the evaluator
//! and persist exactly one submission per completed grading.
//!
//! **Request lifecycle:**
//! received -> validated -> evaluating -> judged -> persisted
//!
//! Validation and lookup failures return before anything is executed or
//! persisted. Runtime failures of the submitted code are verdicts, not errors.

use chrono::Utc;
use grader_common::config::GraderConfig;
use grader_common::types::{ExecutionResult, GradeRequest, NewSubmission, Submission};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::engine::ExecutionEngine;
use crate::error::{ExecutionError, GradingError, Result};
use crate::evaluator;
use crate::store::GradingStore;

#[derive(Clone)]
pub struct Grader {
    store: Arc<dyn GradingStore>,
    engine: Arc<dyn ExecutionEngine>,
    timeout: Duration,
    run_timeout: Duration,
}

/// Fields of a request that passed validation
struct ValidRequest<'a> {
    user_id: i64,
    problem_id: i64,
    code: &'a str,
}

fn validate(request: &GradeRequest) -> Result<ValidRequest<'_>> {
    let user_id = match request.user_id {
        Some(id) if id > 0 => id,
        Some(id) => return Err(GradingError::Validation(format!("user_id must be positive, got {}", id))),
        None => return Err(GradingError::Validation("Missing field: user_id".to_string())),
    };
    let problem_id = match request.problem_id {
        Some(id) if id > 0 => id,
        Some(id) => return Err(GradingError::Validation(format!("problem_id must be positive, got {}", id))),
        None => return Err(GradingError::Validation("Missing field: problem_id".to_string())),
    };
    let code = match request.code.as_deref() {
        Some(code) if !code.trim().is_empty() => code,
        Some(_) => return Err(GradingError::Validation("code must not be empty".to_string())),
        None => return Err(GradingError::Validation("Missing field: code".to_string())),
    };

    Ok(ValidRequest {
        user_id,
        problem_id,
        code,
    })
}

impl Grader {
    pub fn new(
        store: Arc<dyn GradingStore>,
        engine: Arc<dyn ExecutionEngine>,
        config: &GraderConfig,
    ) -> Self {
        Self {
            store,
            engine,
            timeout: config.timeout(),
            run_timeout: config.run_timeout(),
        }
    }

    pub fn store(&self) -> &Arc<dyn GradingStore> {
        &self.store
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Grade one submission and persist the result
    #[tracing::instrument(
        skip(self, request),
        fields(user_id = ?request.user_id, problem_id = ?request.problem_id)
    )]
    pub async fn grade(&self, request: &GradeRequest) -> Result<Submission> {
        debug!(stage = "received", "Grading request received");
        let valid = validate(request)?;

        let problem = self
            .store
            .find_problem(valid.problem_id)
            .await?
            .ok_or(GradingError::NotFound(valid.problem_id))?;

        let test_cases = self.store.find_test_cases(problem.id).await?;
        if test_cases.is_empty() {
            return Err(GradingError::NoTestCases(problem.id));
        }
        debug!(stage = "validated", test_cases = test_cases.len(), "Grading request validated");

        let start = Instant::now();
        debug!(stage = "evaluating", timeout_ms = self.timeout.as_millis() as u64, "Evaluating submission");
        let evaluation = evaluator::evaluate(self.engine.as_ref(), valid.code, &test_cases, self.timeout).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(stage = "judged", verdict = %evaluation.verdict, duration_ms, "Submission judged");

        let submission = self
            .store
            .save_submission(NewSubmission {
                user_id: valid.user_id,
                problem_id: problem.id,
                code: valid.code.to_string(),
                result: evaluation.verdict,
                output: evaluation.diagnostics,
                submitted_at: Utc::now(),
            })
            .await?;

        info!(
            stage = "persisted",
            submission_id = submission.id,
            verdict = %submission.result,
            duration_ms,
            "Submission graded"
        );
        Ok(submission)
    }

    /// Run code once without grading or persisting anything
    pub async fn run(&self, code: &str, stdin: &str) -> std::result::Result<ExecutionResult, ExecutionError> {
        self.engine.run(code, stdin, self.run_timeout).await
    }
}
