//! # gatehouse-server
//!
//! The runnable Gatehouse authorization server: configuration loading,
//! tracing bootstrap, router and middleware composition, client seeding,
//! and the background key-rotation and grant-cleanup jobs.

pub mod config;
pub mod jobs;
pub mod observability;
pub mod seed;
pub mod server;

pub use config::{ConfigError, ServerConfig, load_config};
pub use server::{AppState, build_router, build_state};
