// Persistence collaborator for the grader

use async_trait::async_trait;
use grader_common::fixture::SeededProblem;
use grader_common::types::{NewSubmission, Problem, Submission, TestCase};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StoreError;

/// Storage seen by the grader: one read of problem + test cases and one
/// submission write per grading call.
#[async_trait]
pub trait GradingStore: Send + Sync {
    async fn find_problem(&self, problem_id: i64) -> Result<Option<Problem>, StoreError>;

    /// Test cases in reporting order
    async fn find_test_cases(&self, problem_id: i64) -> Result<Vec<TestCase>, StoreError>;

    /// Persist a graded submission and assign its id
    async fn save_submission(&self, submission: NewSubmission) -> Result<Submission, StoreError>;

    /// A user's submissions, newest first
    async fn list_submissions(&self, user_id: i64) -> Result<Vec<Submission>, StoreError>;

    /// Insert or replace a problem and its full set of test cases
    async fn put_problem(&self, problem: Problem, test_cases: Vec<TestCase>) -> Result<(), StoreError>;
}

/// Load fixture problems into any store. Returns the number of problems written.
pub async fn seed_problems(
    store: &dyn GradingStore,
    problems: Vec<SeededProblem>,
) -> Result<usize, StoreError> {
    let count = problems.len();
    for (problem, cases) in problems {
        tracing::debug!(problem_id = problem.id, test_cases = cases.len(), "Seeding problem");
        store.put_problem(problem, cases).await?;
    }
    Ok(count)
}

/// Process-local store; writes are serialized by a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    problems: HashMap<i64, Problem>,
    test_cases: HashMap<i64, Vec<TestCase>>,
    submissions: Vec<Submission>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_problems(problems: Vec<SeededProblem>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.lock();
            for (problem, cases) in problems {
                inner.test_cases.insert(problem.id, cases);
                inner.problems.insert(problem.id, problem);
            }
        }
        store
    }

    pub fn submission_count(&self) -> usize {
        self.lock().submissions.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // A panic while holding the lock cannot leave the maps half-updated
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl GradingStore for MemoryStore {
    async fn find_problem(&self, problem_id: i64) -> Result<Option<Problem>, StoreError> {
        Ok(self.lock().problems.get(&problem_id).cloned())
    }

    async fn find_test_cases(&self, problem_id: i64) -> Result<Vec<TestCase>, StoreError> {
        Ok(self
            .lock()
            .test_cases
            .get(&problem_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_submission(&self, submission: NewSubmission) -> Result<Submission, StoreError> {
        let mut inner = self.lock();
        let id = inner.submissions.len() as i64 + 1;
        let stored = submission.with_id(id);
        inner.submissions.push(stored.clone());
        Ok(stored)
    }

    async fn list_submissions(&self, user_id: i64) -> Result<Vec<Submission>, StoreError> {
        let mut submissions: Vec<Submission> = self
            .lock()
            .submissions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
        Ok(submissions)
    }

    async fn put_problem(&self, problem: Problem, test_cases: Vec<TestCase>) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.test_cases.insert(problem.id, test_cases);
        inner.problems.insert(problem.id, problem);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use grader_common::types::Verdict;

    fn problem(id: i64) -> Problem {
        Problem {
            id,
            title: format!("Problem {}", id),
            statement: String::new(),
        }
    }

    fn new_submission(user_id: i64, problem_id: i64, offset_secs: i64) -> NewSubmission {
        NewSubmission {
            user_id,
            problem_id,
            code: "print(42)".to_string(),
            result: Verdict::Accepted,
            output: "All test cases passed.".to_string(),
            submitted_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn test_problem_round_trip() {
        let store = MemoryStore::new();
        let cases = vec![TestCase {
            id: 1,
            problem_id: 3,
            input: String::new(),
            expected_output: "42".to_string(),
        }];
        store.put_problem(problem(3), cases.clone()).await.unwrap();

        assert_eq!(store.find_problem(3).await.unwrap(), Some(problem(3)));
        assert_eq!(store.find_test_cases(3).await.unwrap(), cases);
        assert!(store.find_problem(4).await.unwrap().is_none());
        assert!(store.find_test_cases(4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submission_ids_sequential() {
        let store = MemoryStore::new();
        let first = store.save_submission(new_submission(1, 1, 0)).await.unwrap();
        let second = store.save_submission(new_submission(2, 1, 0)).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.submission_count(), 2);
    }

    #[tokio::test]
    async fn test_list_submissions_newest_first() {
        let store = MemoryStore::new();
        store.save_submission(new_submission(7, 1, 0)).await.unwrap();
        store.save_submission(new_submission(8, 1, 5)).await.unwrap();
        store.save_submission(new_submission(7, 2, 10)).await.unwrap();

        let listed = store.list_submissions(7).await.unwrap();
        let problems: Vec<i64> = listed.iter().map(|s| s.problem_id).collect();
        assert_eq!(problems, vec![2, 1]);
        assert!(listed.iter().all(|s| s.user_id == 7));
    }

    #[tokio::test]
    async fn test_put_problem_replaces_cases() {
        let store = MemoryStore::with_problems(vec![(
            problem(1),
            vec![TestCase {
                id: 1,
                problem_id: 1,
                input: "a".to_string(),
                expected_output: "b".to_string(),
            }],
        )]);

        store.put_problem(problem(1), vec![]).await.unwrap();

        assert!(store.find_test_cases(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seed_problems() {
        let store = MemoryStore::new();
        let seeded = seed_problems(&store, vec![(problem(1), vec![]), (problem(2), vec![])])
            .await
            .unwrap();

        assert_eq!(seeded, 2);
        assert!(store.find_problem(2).await.unwrap().is_some());
    }
}
