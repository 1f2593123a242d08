// Problem fixture files used to seed a store
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::types::{Problem, TestCase};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseFixture {
    #[serde(default)]
    pub input: String,
    pub expected_output: String,
}

/// A problem as written in a fixture file.
///
/// Either `test_cases` or the single `input`/`expected_output` pair may be given;
/// the pair becomes one test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemFixture {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub statement: String,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub expected_output: Option<String>,
    #[serde(default)]
    pub test_cases: Vec<TestCaseFixture>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemsFile {
    pub problems: Vec<ProblemFixture>,
}

/// A problem together with its ordered test cases
pub type SeededProblem = (Problem, Vec<TestCase>);

impl ProblemsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read problems file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid problems file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: ProblemsFile =
            serde_json::from_str(content).context("Failed to parse problems JSON")?;

        let mut seen = HashSet::new();
        for problem in &file.problems {
            if problem.id <= 0 {
                bail!("Problem id must be positive, got {}", problem.id);
            }
            if !seen.insert(problem.id) {
                bail!("Duplicate problem id {}", problem.id);
            }
            if problem.input.is_some() && problem.expected_output.is_none() {
                bail!("Problem {} has an input but no expected_output", problem.id);
            }
        }

        Ok(file)
    }

    /// Expand fixtures into problems and test cases.
    ///
    /// Test case ids are assigned sequentially across the whole file.
    pub fn into_problems(self) -> Vec<SeededProblem> {
        let mut next_case_id = 1;
        let mut seeded = Vec::with_capacity(self.problems.len());

        for fixture in self.problems {
            let mut cases: Vec<TestCaseFixture> = fixture.test_cases;
            if cases.is_empty() {
                if let Some(expected_output) = fixture.expected_output {
                    cases.push(TestCaseFixture {
                        input: fixture.input.unwrap_or_default(),
                        expected_output,
                    });
                }
            }

            let test_cases = cases
                .into_iter()
                .map(|case| {
                    let test_case = TestCase {
                        id: next_case_id,
                        problem_id: fixture.id,
                        input: case.input,
                        expected_output: case.expected_output,
                    };
                    next_case_id += 1;
                    test_case
                })
                .collect();

            let problem = Problem {
                id: fixture.id,
                title: fixture.title,
                statement: fixture.statement,
            };
            seeded.push((problem, test_cases));
        }

        seeded
    }
}
