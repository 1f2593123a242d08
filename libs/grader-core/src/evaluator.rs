//! Test Evaluator - Fail-Fast Verdict Logic
//!
//! **Core Responsibility:**
//! Run the submission once per test case, compare outputs, stop at the first
//! failing case and describe it.
//!
//! **Classification (per case, in priority order):**
//! 1. Timeout reported by the engine -> TLE
//! 2. Non-zero or missing exit status -> RE
//! 3. Trimmed stdout differs from trimmed expected output -> WA
//! 4. Otherwise the case passes
//!
//! **Normalization Rules:**
//! - Trim leading and trailing whitespace: YES
//! - Internal whitespace significant: YES
//! - Case sensitivity: YES
//! - Stdout cut at the capture limit never matches
//!
//! Quoted input and output in diagnostics are cut to `MAX_REPORT_BYTES` each.

use grader_common::types::{ExecutionResult, TestCase, Verdict};
use std::borrow::Cow;
use std::time::Duration;
use tracing::{debug, info};

use crate::engine::ExecutionEngine;

/// Diagnostic recorded when every case passes
pub const SUCCESS_MESSAGE: &str = "All test cases passed.";

/// Longest excerpt of input, expected or actual output quoted in a diagnostic
pub const MAX_REPORT_BYTES: usize = 2048;

/// Aggregated outcome of evaluating one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub diagnostics: String,
}

impl Evaluation {
    pub fn passed(&self) -> bool {
        self.verdict.is_accepted()
    }

    fn accepted() -> Self {
        Self {
            verdict: Verdict::Accepted,
            diagnostics: SUCCESS_MESSAGE.to_string(),
        }
    }
}

/// Normalize output string for comparison
///
/// Removes surrounding whitespace, including trailing newlines and `\r\n`
/// endings at the edges. Preserves internal whitespace and case.
fn normalize_output(output: &str) -> &str {
    output.trim()
}

/// Cut `text` for a diagnostic on a char boundary. `cut_upstream` marks text
/// the engine already truncated.
fn excerpt(text: &str, cut_upstream: bool) -> Cow<'_, str> {
    if text.len() <= MAX_REPORT_BYTES {
        return if cut_upstream {
            Cow::Owned(format!("{}\n... [output truncated]", text))
        } else {
            Cow::Borrowed(text)
        };
    }

    let mut end = MAX_REPORT_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let omitted = text.len() - end;
    let suffix = if cut_upstream { "+" } else { "" };
    Cow::Owned(format!(
        "{}\n... [truncated, {}{} more bytes]",
        &text[..end],
        omitted,
        suffix
    ))
}

/// Judge one case. `None` means the case passed.
fn judge_case(output: &ExecutionResult, test_case: &TestCase) -> Option<Verdict> {
    if output.timed_out {
        Some(Verdict::TimeLimitExceeded)
    } else if output.exit_status != Some(0) {
        Some(Verdict::RuntimeError)
    } else if output.stdout_truncated
        || normalize_output(&output.stdout) != normalize_output(&test_case.expected_output)
    {
        Some(Verdict::WrongAnswer)
    } else {
        None
    }
}

fn describe_failure(
    verdict: Verdict,
    case_number: usize,
    test_case: &TestCase,
    output: &ExecutionResult,
    timeout: Duration,
) -> String {
    match verdict {
        Verdict::TimeLimitExceeded => format!(
            "Time limit exceeded on test case {} (limit: {} ms)",
            case_number,
            timeout.as_millis()
        ),
        Verdict::RuntimeError => {
            let status = match output.exit_status {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            };
            format!(
                "Runtime error on test case {} ({})\nInput:\n{}\nExpected:\n{}\nGot:\n{}\nStderr:\n{}\n",
                case_number,
                status,
                excerpt(&test_case.input, false),
                excerpt(normalize_output(&test_case.expected_output), false),
                excerpt(normalize_output(&output.stdout), output.stdout_truncated),
                excerpt(output.stderr.trim_end(), output.stderr_truncated),
            )
        }
        _ => format!(
            "Failed test case {}\nInput:\n{}\nExpected:\n{}\nGot:\n{}\n",
            case_number,
            excerpt(&test_case.input, false),
            excerpt(normalize_output(&test_case.expected_output), false),
            excerpt(normalize_output(&output.stdout), output.stdout_truncated),
        ),
    }
}

/// Evaluate code against an ordered set of test cases
///
/// Stops at the first failing case. An engine failure (nothing could be run)
/// is reported as a runtime error carrying the underlying message.
///
/// ## Arguments
/// * `engine` - Execution backend, called once per case
/// * `code` - Submitted source
/// * `cases` - Test cases in reporting order; must not be empty
/// * `timeout` - Wall-clock limit per case
pub async fn evaluate(
    engine: &dyn ExecutionEngine,
    code: &str,
    cases: &[TestCase],
    timeout: Duration,
) -> Evaluation {
    if cases.is_empty() {
        // Callers reject problems without cases; never accept vacuously
        return Evaluation {
            verdict: Verdict::RuntimeError,
            diagnostics: "No test cases to evaluate".to_string(),
        };
    }

    for (idx, test_case) in cases.iter().enumerate() {
        let case_number = idx + 1;

        let output = match engine.run(code, &test_case.input, timeout).await {
            Ok(output) => output,
            Err(e) => {
                info!(case = case_number, error = %e, "Execution error");
                return Evaluation {
                    verdict: Verdict::RuntimeError,
                    diagnostics: format!("Execution Error: {}", e),
                };
            }
        };

        match judge_case(&output, test_case) {
            None => {
                debug!(
                    case = case_number,
                    test_case_id = test_case.id,
                    duration_ms = output.duration_ms,
                    "Test case passed"
                );
            }
            Some(verdict) => {
                info!(
                    case = case_number,
                    test_case_id = test_case.id,
                    verdict = %verdict,
                    duration_ms = output.duration_ms,
                    "Test case failed"
                );
                return Evaluation {
                    verdict,
                    diagnostics: describe_failure(verdict, case_number, test_case, &output, timeout),
                };
            }
        }
    }

    Evaluation::accepted()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ExecutionError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Engine that replays scripted outcomes and records the stdin it was given
    pub(crate) struct ScriptedEngine {
        outcomes: Mutex<VecDeque<Result<ExecutionResult, ExecutionError>>>,
        pub(crate) inputs: Mutex<Vec<String>>,
    }

    impl ScriptedEngine {
        pub(crate) fn new(outcomes: Vec<Result<ExecutionResult, ExecutionError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                inputs: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.inputs.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ExecutionEngine for ScriptedEngine {
        async fn run(
            &self,
            _code: &str,
            stdin: &str,
            _timeout: Duration,
        ) -> Result<ExecutionResult, ExecutionError> {
            self.inputs.lock().unwrap().push(stdin.to_string());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted engine ran out of outcomes")
        }
    }

    pub(crate) fn stdout(text: &str) -> Result<ExecutionResult, ExecutionError> {
        Ok(ExecutionResult {
            stdout: text.to_string(),
            stderr: String::new(),
            exit_status: Some(0),
            duration_ms: 5,
            ..Default::default()
        })
    }

    pub(crate) fn timed_out() -> Result<ExecutionResult, ExecutionError> {
        Ok(ExecutionResult {
            timed_out: true,
            duration_ms: 2000,
            ..Default::default()
        })
    }

    pub(crate) fn make_case(id: i64, input: &str, expected_output: &str) -> TestCase {
        TestCase {
            id,
            problem_id: 1,
            input: input.to_string(),
            expected_output: expected_output.to_string(),
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[test]
    fn test_normalize_output() {
        assert_eq!(normalize_output("hello"), "hello");
        assert_eq!(normalize_output("  hello  "), "hello");
        assert_eq!(normalize_output("hello\r\n"), "hello");
        assert_eq!(normalize_output("\nhello world\n"), "hello world");
        assert_eq!(normalize_output("   "), "");
    }

    #[tokio::test]
    async fn test_all_pass() {
        let engine = ScriptedEngine::new(vec![stdout("10\n"), stdout("20\n")]);
        let cases = vec![make_case(1, "5", "10"), make_case(2, "10", "20")];

        let evaluation = evaluate(&engine, "code", &cases, TIMEOUT).await;

        assert!(evaluation.passed());
        assert_eq!(evaluation.verdict, Verdict::Accepted);
        assert_eq!(evaluation.diagnostics, SUCCESS_MESSAGE);
        assert_eq!(*engine.inputs.lock().unwrap(), vec!["5", "10"]);
    }

    #[tokio::test]
    async fn test_whitespace_trimming() {
        let engine = ScriptedEngine::new(vec![stdout("  42  \n\n")]);
        let cases = vec![make_case(1, "", "42\n")];

        let evaluation = evaluate(&engine, "code", &cases, TIMEOUT).await;

        assert_eq!(evaluation.verdict, Verdict::Accepted);
    }

    #[tokio::test]
    async fn test_internal_whitespace_significant() {
        let engine = ScriptedEngine::new(vec![stdout("1  2")]);
        let cases = vec![make_case(1, "", "1 2")];

        let evaluation = evaluate(&engine, "code", &cases, TIMEOUT).await;

        assert_eq!(evaluation.verdict, Verdict::WrongAnswer);
    }

    #[tokio::test]
    async fn test_case_sensitivity() {
        let engine = ScriptedEngine::new(vec![stdout("hello")]);
        let cases = vec![make_case(1, "", "Hello")];

        let evaluation = evaluate(&engine, "code", &cases, TIMEOUT).await;

        assert_eq!(evaluation.verdict, Verdict::WrongAnswer);
    }

    #[tokio::test]
    async fn test_mismatch_stops_at_first_failure() {
        let engine = ScriptedEngine::new(vec![stdout("ok"), stdout("41"), stdout("never")]);
        let cases = vec![
            make_case(1, "first-input", "ok"),
            make_case(2, "second-input", "42"),
            make_case(3, "third-input", "third-expected"),
        ];

        let evaluation = evaluate(&engine, "code", &cases, TIMEOUT).await;

        assert_eq!(evaluation.verdict, Verdict::WrongAnswer);
        assert_eq!(engine.calls(), 2);
        assert!(evaluation.diagnostics.contains("test case 2"));
        assert!(evaluation.diagnostics.contains("second-input"));
        assert!(evaluation.diagnostics.contains("42"));
        assert!(evaluation.diagnostics.contains("41"));
        assert!(!evaluation.diagnostics.contains("third-input"));
        assert!(!evaluation.diagnostics.contains("third-expected"));
    }

    #[tokio::test]
    async fn test_timeout_stops_evaluation() {
        let engine = ScriptedEngine::new(vec![timed_out(), stdout("unused")]);
        let cases = vec![make_case(1, "", "1"), make_case(2, "", "2")];

        let evaluation = evaluate(&engine, "code", &cases, TIMEOUT).await;

        assert_eq!(evaluation.verdict, Verdict::TimeLimitExceeded);
        assert_eq!(engine.calls(), 1);
        assert!(evaluation.diagnostics.contains("Time limit exceeded"));
        assert!(evaluation.diagnostics.contains("2000 ms"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_runtime_error() {
        let engine = ScriptedEngine::new(vec![Ok(ExecutionResult {
            stdout: String::new(),
            stderr: "ZeroDivisionError: division by zero\n".to_string(),
            exit_status: Some(1),
            duration_ms: 3,
            ..Default::default()
        })]);
        let cases = vec![make_case(1, "0", "inf")];

        let evaluation = evaluate(&engine, "code", &cases, TIMEOUT).await;

        assert_eq!(evaluation.verdict, Verdict::RuntimeError);
        assert!(evaluation.diagnostics.contains("exit status 1"));
        assert!(evaluation.diagnostics.contains("ZeroDivisionError"));
    }

    #[tokio::test]
    async fn test_execution_error_is_runtime_error() {
        let engine = ScriptedEngine::new(vec![Err(ExecutionError::Spawn {
            command: "python3".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        })]);
        let cases = vec![make_case(1, "", "1"), make_case(2, "", "2")];

        let evaluation = evaluate(&engine, "code", &cases, TIMEOUT).await;

        assert_eq!(evaluation.verdict, Verdict::RuntimeError);
        assert_eq!(engine.calls(), 1);
        assert!(evaluation.diagnostics.starts_with("Execution Error:"));
        assert!(evaluation.diagnostics.contains("python3"));
    }

    #[tokio::test]
    async fn test_empty_cases_never_accepted() {
        let engine = ScriptedEngine::new(vec![]);

        let evaluation = evaluate(&engine, "code", &[], TIMEOUT).await;

        assert!(!evaluation.passed());
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_large_output_is_cut_in_diagnostics() {
        let flood = "x".repeat(100_000);
        let engine = ScriptedEngine::new(vec![stdout(&flood)]);
        let cases = vec![make_case(1, "", "42")];

        let evaluation = evaluate(&engine, "code", &cases, TIMEOUT).await;

        assert_eq!(evaluation.verdict, Verdict::WrongAnswer);
        assert!(evaluation.diagnostics.len() < MAX_REPORT_BYTES + 200);
        assert!(evaluation.diagnostics.contains("Expected:\n42"));
        assert!(evaluation.diagnostics.contains("[truncated, 97952 more bytes]"));
    }

    #[tokio::test]
    async fn test_large_stderr_is_cut_in_diagnostics() {
        let engine = ScriptedEngine::new(vec![Ok(ExecutionResult {
            stderr: "é".repeat(50_000),
            exit_status: Some(1),
            ..Default::default()
        })]);
        let cases = vec![make_case(1, "", "42")];

        let evaluation = evaluate(&engine, "code", &cases, TIMEOUT).await;

        assert_eq!(evaluation.verdict, Verdict::RuntimeError);
        assert!(evaluation.diagnostics.len() < MAX_REPORT_BYTES + 300);
        assert!(evaluation.diagnostics.contains("more bytes]"));
    }

    #[tokio::test]
    async fn test_truncated_stdout_never_accepted() {
        let engine = ScriptedEngine::new(vec![Ok(ExecutionResult {
            stdout: "42".to_string(),
            exit_status: Some(0),
            stdout_truncated: true,
            ..Default::default()
        })]);
        let cases = vec![make_case(1, "", "42")];

        let evaluation = evaluate(&engine, "code", &cases, TIMEOUT).await;

        assert_eq!(evaluation.verdict, Verdict::WrongAnswer);
        assert!(evaluation.diagnostics.contains("[output truncated]"));
    }

    #[tokio::test]
    async fn test_truncated_stderr_does_not_fail_correct_output() {
        let engine = ScriptedEngine::new(vec![Ok(ExecutionResult {
            stdout: "42\n".to_string(),
            stderr: "debug".repeat(10),
            exit_status: Some(0),
            stderr_truncated: true,
            ..Default::default()
        })]);
        let cases = vec![make_case(1, "", "42")];

        let evaluation = evaluate(&engine, "code", &cases, TIMEOUT).await;

        assert!(evaluation.passed());
    }
}
