use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An exercise that submissions are graded against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub statement: String,
}

/// One (input, expected output) pair belonging to a problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: i64,
    pub problem_id: i64,
    #[serde(default)]
    pub input: String,
    pub expected_output: String,
}

/// Final outcome of grading one submission.
///
/// Serialized as the short judge labels (`AC`, `WA`, `RE`, `TLE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "AC")]
    Accepted,
    #[serde(rename = "WA")]
    WrongAnswer,
    #[serde(rename = "RE")]
    RuntimeError,
    #[serde(rename = "TLE")]
    TimeLimitExceeded,
}

impl Verdict {
    pub const ALL: [Verdict; 4] = [
        Verdict::Accepted,
        Verdict::WrongAnswer,
        Verdict::RuntimeError,
        Verdict::TimeLimitExceeded,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Accepted => "AC",
            Verdict::WrongAnswer => "WA",
            Verdict::RuntimeError => "RE",
            Verdict::TimeLimitExceeded => "TLE",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Incoming grading request. Fields are optional so that missing values
/// surface as validation errors instead of deserialization failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradeRequest {
    pub user_id: Option<i64>,
    pub problem_id: Option<i64>,
    pub code: Option<String>,
}

/// A submission that has been graded but not yet assigned an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubmission {
    pub user_id: i64,
    pub problem_id: i64,
    pub code: String,
    pub result: Verdict,
    pub output: String,
    pub submitted_at: DateTime<Utc>,
}

impl NewSubmission {
    pub fn with_id(self, id: i64) -> Submission {
        Submission {
            id,
            user_id: self.user_id,
            problem_id: self.problem_id,
            code: self.code,
            result: self.result,
            output: self.output,
            submitted_at: self.submitted_at,
        }
    }
}

/// A persisted grading attempt. Never mutated after it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub user_id: i64,
    pub problem_id: i64,
    pub code: String,
    pub result: Verdict,
    pub output: String,
    pub submitted_at: DateTime<Utc>,
}

/// Raw outcome of running a program once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal or by the timeout.
    pub exit_status: Option<i32>,
    pub timed_out: bool,
    pub duration_ms: u64,
    /// Stdout went past the capture limit and was cut
    #[serde(default)]
    pub stdout_truncated: bool,
    #[serde(default)]
    pub stderr_truncated: bool,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_status == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_serializes_as_label() {
        for verdict in Verdict::ALL {
            let json = serde_json::to_string(&verdict).unwrap();
            assert_eq!(json, format!("\"{}\"", verdict.label()));
        }
        let parsed: Verdict = serde_json::from_str("\"TLE\"").unwrap();
        assert_eq!(parsed, Verdict::TimeLimitExceeded);
    }

    #[test]
    fn test_grade_request_missing_fields() {
        let req: GradeRequest = serde_json::from_str(r#"{"user_id": 3}"#).unwrap();
        assert_eq!(req.user_id, Some(3));
        assert!(req.problem_id.is_none());
        assert!(req.code.is_none());
    }

    #[test]
    fn test_execution_result_success() {
        let mut result = ExecutionResult {
            exit_status: Some(0),
            ..Default::default()
        };
        assert!(result.success());

        result.exit_status = Some(1);
        assert!(!result.success());

        result.exit_status = None;
        assert!(!result.success());
    }
}
