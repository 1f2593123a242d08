pub mod engine;
pub mod error;
pub mod evaluator;
pub mod grader;
pub mod redis_store;
pub mod store;

pub use engine::{ExecutionEngine, ProcessEngine};
pub use error::{ExecutionError, GradingError, StoreError};
pub use evaluator::{evaluate, Evaluation};
pub use grader::Grader;
pub use redis_store::RedisStore;
pub use store::{seed_problems, GradingStore, MemoryStore};
