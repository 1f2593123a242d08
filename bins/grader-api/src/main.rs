mod error;
mod handlers;
mod metrics;
mod routes;

use anyhow::{bail, Context};
use axum::Router;
use grader_common::config::GraderConfig;
use grader_common::fixture::ProblemsFile;
use grader_core::{seed_problems, Grader, GradingStore, MemoryStore, ProcessEngine, RedisStore};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub grader: Grader,
}

async fn build_store() -> anyhow::Result<Arc<dyn GradingStore>> {
    let kind = std::env::var("GRADER_STORE").unwrap_or_else(|_| "memory".to_string());

    let store: Arc<dyn GradingStore> = match kind.to_lowercase().as_str() {
        "memory" => {
            info!("Using in-memory store");
            Arc::new(MemoryStore::new())
        }
        "redis" => {
            let redis_url = std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
            let store = RedisStore::connect(&redis_url)
                .await
                .with_context(|| format!("Failed to connect to Redis at {}", redis_url))?;
            info!("Connected to Redis: {}", redis_url);
            Arc::new(store)
        }
        other => bail!("Invalid GRADER_STORE '{}': expected 'memory' or 'redis'", other),
    };

    if let Ok(path) = std::env::var("PROBLEMS_FILE") {
        let problems = ProblemsFile::load(Path::new(&path))?.into_problems();
        let count = seed_problems(store.as_ref(), problems)
            .await
            .context("Failed to seed problems")?;
        info!(problems = count, file = %path, "Seeded problems");
    } else if kind == "memory" {
        warn!("PROBLEMS_FILE not set; the in-memory store starts empty");
    }

    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Grader API booting...");

    let config = GraderConfig::load_default().map_err(|e| {
        error!("Failed to load grader configuration: {:#}", e);
        e
    })?;
    info!(
        timeout_ms = config.timeout_ms,
        run_timeout_ms = config.run_timeout_ms,
        interpreter = %config.interpreter.command,
        "Loaded grader configuration"
    );

    let store = build_store().await?;
    let engine = Arc::new(ProcessEngine::from_config(&config));
    let state = Arc::new(AppState {
        grader: Grader::new(store, engine, &config),
    });

    let app = Router::new().merge(routes::routes()).with_state(state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Grader API shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
    warn!("Received shutdown signal, finishing in-flight requests...");
}
