pub mod config;
pub mod fixture;
pub mod redis;
pub mod types;
