// Grader configuration: JSON file first, environment overrides second
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/grader.json";

/// Safety limits to keep pathological payloads away from the interpreter
pub const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB
pub const MAX_TEST_INPUT_BYTES: usize = 10 * 1024 * 1024; // 10MB
/// Bytes kept per output stream; anything beyond is drained and dropped
pub const MAX_OUTPUT_BYTES: usize = 1024 * 1024; // 1MB

/// How submitted code is turned into a running process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub file_extension: String,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            command: "python3".to_string(),
            args: vec!["-I".to_string()],
            file_extension: "py".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraderConfig {
    /// Wall-clock limit for each test case during grading
    pub timeout_ms: u64,
    /// Wall-clock limit for run-only executions
    pub run_timeout_ms: u64,
    pub interpreter: InterpreterConfig,
    pub max_source_bytes: usize,
    pub max_input_bytes: usize,
    pub max_output_bytes: usize,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            run_timeout_ms: 5000,
            interpreter: InterpreterConfig::default(),
            max_source_bytes: MAX_SOURCE_CODE_BYTES,
            max_input_bytes: MAX_TEST_INPUT_BYTES,
            max_output_bytes: MAX_OUTPUT_BYTES,
        }
    }
}

impl GraderConfig {
    /// Load configuration from a JSON file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Grader config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: GraderConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `GRADER_CONFIG` (or config/grader.json), falling back to
    /// defaults when no file exists, then apply environment overrides.
    pub fn load_default() -> Result<Self> {
        let path = std::env::var("GRADER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let path = Path::new(&path);

        let config = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };

        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `GRADER_TIMEOUT_MS`, `GRADER_RUN_TIMEOUT_MS` and `GRADER_INTERPRETER`.
    ///
    /// The lookup is injected so tests do not have to touch the process environment.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("GRADER_TIMEOUT_MS") {
            self.timeout_ms = value
                .parse()
                .with_context(|| format!("Invalid GRADER_TIMEOUT_MS: {}", value))?;
        }
        if let Some(value) = lookup("GRADER_RUN_TIMEOUT_MS") {
            self.run_timeout_ms = value
                .parse()
                .with_context(|| format!("Invalid GRADER_RUN_TIMEOUT_MS: {}", value))?;
        }
        if let Some(value) = lookup("GRADER_INTERPRETER") {
            self.interpreter.command = value;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            bail!("timeout_ms must be greater than zero");
        }
        if self.run_timeout_ms == 0 {
            bail!("run_timeout_ms must be greater than zero");
        }
        if self.max_output_bytes == 0 {
            bail!("max_output_bytes must be greater than zero");
        }
        if self.interpreter.command.trim().is_empty() {
            bail!("interpreter.command must not be empty");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }
}
