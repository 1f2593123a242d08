// CLI commands for seeding and local grading
use anyhow::{bail, Context, Result};
use grader_common::config::GraderConfig;
use grader_common::fixture::ProblemsFile;
use grader_common::types::{ExecutionResult, GradeRequest, Submission};
use grader_core::{seed_problems, Grader, MemoryStore, ProcessEngine, RedisStore};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub fn load_config() -> Result<GraderConfig> {
    GraderConfig::load_default().context("Failed to load grader configuration")
}

fn read_source(path: &Path) -> Result<String> {
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn local_grader(config: &GraderConfig, fixture: ProblemsFile) -> Grader {
    let store = Arc::new(MemoryStore::with_problems(fixture.into_problems()));
    let engine = Arc::new(ProcessEngine::from_config(config));
    Grader::new(store, engine, config)
}

/// Load a fixture file into Redis
pub async fn seed(file: &Path, redis_url: &str) -> Result<()> {
    let fixture = ProblemsFile::load(file)?;
    let store = RedisStore::connect(redis_url)
        .await
        .with_context(|| format!("Failed to connect to Redis at {}", redis_url))?;

    println!("🌱 Seeding problems from {}...", file.display());
    let count = seed_problems(&store, fixture.into_problems())
        .await
        .context("Failed to write problems")?;
    info!(problems = count, redis_url, "Seeded problems");
    println!("✅ Seeded {} problem(s) into {}", count, redis_url);

    Ok(())
}

/// Grade a source file against one fixture problem using an in-memory store
pub async fn grade_file(
    config: &GraderConfig,
    problems: &Path,
    problem_id: i64,
    user_id: i64,
    code_file: &Path,
) -> Result<Submission> {
    let fixture = ProblemsFile::load(problems)?;
    let code = read_source(code_file)?;
    debug!(
        problems = fixture.problems.len(),
        problem_id,
        code_file = %code_file.display(),
        "Grading locally"
    );
    let grader = local_grader(config, fixture);

    let request = GradeRequest {
        user_id: Some(user_id),
        problem_id: Some(problem_id),
        code: Some(code),
    };
    let submission = grader.grade(&request).await?;
    Ok(submission)
}

pub async fn execute_file(
    config: &GraderConfig,
    code_file: &Path,
    stdin_file: Option<&Path>,
) -> Result<ExecutionResult> {
    let code = read_source(code_file)?;
    let stdin = match stdin_file {
        Some(path) => read_source(path)?,
        None => String::new(),
    };

    let grader = local_grader(config, ProblemsFile::default());
    let result = grader.run(&code, &stdin).await?;
    debug!(
        exit_status = ?result.exit_status,
        timed_out = result.timed_out,
        duration_ms = result.duration_ms,
        "Run finished"
    );
    Ok(result)
}

/// Run a source file once, echoing its output. Returns whether it succeeded.
pub async fn run_file(config: &GraderConfig, code_file: &Path, stdin_file: Option<&Path>) -> Result<bool> {
    let result = execute_file(config, code_file, stdin_file).await?;

    print!("{}", result.stdout);
    eprint!("{}", result.stderr);

    if result.timed_out {
        eprintln!("⏱️  Timed out after {} ms", config.run_timeout_ms);
    } else if let Some(code) = result.exit_status.filter(|c| *c != 0) {
        eprintln!("❌ Exited with status {}", code);
    } else if result.exit_status.is_none() {
        eprintln!("❌ Terminated by signal");
    }

    Ok(result.success())
}
