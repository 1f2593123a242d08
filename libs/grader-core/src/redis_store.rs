use async_trait::async_trait;
use grader_common::redis::{
    problem_key, submission_key, test_cases_key, user_submissions_key, SUBMISSION_SEQ_KEY,
};
use grader_common::types::{NewSubmission, Problem, Submission, TestCase};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::StoreError;
use crate::store::GradingStore;

/// Redis-backed store. Submission ids come from an atomic INCR counter so
/// concurrent API instances never hand out the same id.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl GradingStore for RedisStore {
    async fn find_problem(&self, problem_id: i64) -> Result<Option<Problem>, StoreError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(problem_key(problem_id)).await?;

        match payload {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn find_test_cases(&self, problem_id: i64) -> Result<Vec<TestCase>, StoreError> {
        let mut conn = self.conn.clone();
        let payloads: Vec<String> = conn.lrange(test_cases_key(problem_id), 0, -1).await?;

        payloads
            .iter()
            .map(|data| serde_json::from_str(data).map_err(StoreError::from))
            .collect()
    }

    async fn save_submission(&self, submission: NewSubmission) -> Result<Submission, StoreError> {
        let mut conn = self.conn.clone();
        let id: i64 = conn.incr(SUBMISSION_SEQ_KEY, 1).await?;
        let stored = submission.with_id(id);
        let payload = serde_json::to_string(&stored)?;

        let _: () = redis::pipe()
            .atomic()
            .set(submission_key(id), payload)
            .ignore()
            .lpush(user_submissions_key(stored.user_id), id)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(stored)
    }

    async fn list_submissions(&self, user_id: i64) -> Result<Vec<Submission>, StoreError> {
        let mut conn = self.conn.clone();
        let ids: Vec<i64> = conn.lrange(user_submissions_key(user_id), 0, -1).await?;

        let mut submissions = Vec::with_capacity(ids.len());
        for id in ids {
            let payload: Option<String> = conn.get(submission_key(id)).await?;
            if let Some(data) = payload {
                submissions.push(serde_json::from_str(&data)?);
            }
        }
        Ok(submissions)
    }

    async fn put_problem(&self, problem: Problem, test_cases: Vec<TestCase>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let problem_payload = serde_json::to_string(&problem)?;
        let case_payloads = test_cases
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;

        let cases_key = test_cases_key(problem.id);
        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(problem_key(problem.id), problem_payload)
            .ignore()
            .del(&cases_key)
            .ignore();
        if !case_payloads.is_empty() {
            pipe.rpush(&cases_key, case_payloads).ignore();
        }

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use grader_common::types::Verdict;

    async fn connect() -> RedisStore {
        RedisStore::connect("redis://127.0.0.1:6379")
            .await
            .expect("Failed to connect to Redis")
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_problem_and_cases_round_trip() {
        let store = connect().await;
        let problem = Problem {
            id: 900_001,
            title: "Echo".to_string(),
            statement: "Print the input".to_string(),
        };
        let cases = vec![
            TestCase {
                id: 1,
                problem_id: problem.id,
                input: "a".to_string(),
                expected_output: "a".to_string(),
            },
            TestCase {
                id: 2,
                problem_id: problem.id,
                input: "b".to_string(),
                expected_output: "b".to_string(),
            },
        ];

        store.put_problem(problem.clone(), cases.clone()).await.unwrap();

        assert_eq!(store.find_problem(problem.id).await.unwrap(), Some(problem.clone()));
        assert_eq!(store.find_test_cases(problem.id).await.unwrap(), cases);
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_submissions_listed_newest_first() {
        let store = connect().await;
        let user_id = 900_000 + (Utc::now().timestamp_subsec_micros() as i64);

        let mut ids = Vec::new();
        for verdict in [Verdict::WrongAnswer, Verdict::Accepted] {
            let saved = store
                .save_submission(NewSubmission {
                    user_id,
                    problem_id: 1,
                    code: "print(1)".to_string(),
                    result: verdict,
                    output: String::new(),
                    submitted_at: Utc::now(),
                })
                .await
                .unwrap();
            ids.push(saved.id);
        }

        let listed = store.list_submissions(user_id).await.unwrap();
        assert_eq!(listed[0].id, ids[1]);
        assert_eq!(listed[1].id, ids[0]);
        assert_eq!(listed[0].result, Verdict::Accepted);
    }
}
