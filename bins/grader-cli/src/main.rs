mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "grader-cli")]
#[command(about = "Grader CLI - Seed problems, grade and run submissions locally", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a problems fixture file into Redis
    Seed {
        /// Problems fixture (JSON)
        #[arg(short, long, default_value = "config/problems.json")]
        file: PathBuf,

        /// Redis connection URL
        #[arg(short, long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
        redis_url: String,
    },

    /// Grade a code file against a problem from a fixture file
    Grade {
        /// Problems fixture (JSON)
        #[arg(short, long, default_value = "config/problems.json")]
        problems: PathBuf,

        /// Problem to grade against
        #[arg(long)]
        problem_id: i64,

        /// Source file to submit
        #[arg(short, long)]
        code_file: PathBuf,

        /// Submitting user
        #[arg(short, long, default_value = "1")]
        user_id: i64,
    },

    /// Run a code file once and print its output
    Run {
        /// Source file to execute
        #[arg(short, long)]
        code_file: PathBuf,

        /// File whose contents are fed to stdin
        #[arg(short, long)]
        stdin_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Seed { file, redis_url } => {
            commands::seed(&file, &redis_url).await?;
        }
        Commands::Grade {
            problems,
            problem_id,
            code_file,
            user_id,
        } => {
            let config = commands::load_config()?;
            let submission =
                commands::grade_file(&config, &problems, problem_id, user_id, &code_file).await?;
            println!("{}", serde_json::to_string_pretty(&submission)?);
        }
        Commands::Run {
            code_file,
            stdin_file,
        } => {
            let config = commands::load_config()?;
            let success = commands::run_file(&config, &code_file, stdin_file.as_deref()).await?;
            if !success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
