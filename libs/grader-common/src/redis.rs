//! Redis key semantics shared by every component that touches the store.
//! Keys are deterministic so that the API and CLI never drift apart.

pub const PROBLEM_PREFIX: &str = "grader:problem";
pub const TEST_CASES_PREFIX: &str = "grader:testcases";
pub const SUBMISSION_PREFIX: &str = "grader:submission";
pub const USER_PREFIX: &str = "grader:user";

/// Counter used to assign submission ids (INCR)
pub const SUBMISSION_SEQ_KEY: &str = "grader:submission:seq";

/// Problem record (JSON)
pub fn problem_key(problem_id: i64) -> String {
    format!("{}:{}", PROBLEM_PREFIX, problem_id)
}

/// Ordered list of a problem's test cases (JSON per element)
pub fn test_cases_key(problem_id: i64) -> String {
    format!("{}:{}", TEST_CASES_PREFIX, problem_id)
}

/// Submission record (JSON)
pub fn submission_key(submission_id: i64) -> String {
    format!("{}:{}", SUBMISSION_PREFIX, submission_id)
}

/// List of a user's submission ids, newest first (LPUSH)
pub fn user_submissions_key(user_id: i64) -> String {
    format!("{}:{}:submissions", USER_PREFIX, user_id)
}
