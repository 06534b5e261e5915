//! movie-bench: a database benchmark harness
//!
//! Runners execute a fixed registry of query scenarios against a seeded
//! movies database. Results are first checked for row-count parity, then
//! every scenario is timed per runner with criterion.

pub mod backend;
pub mod bench;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod seed;
pub mod validate;

pub use bench::{execute, BenchOptions};
pub use config::Config;
pub use dispatch::{dispatch, BenchGroup, BenchPlan};
pub use engine::EngineConfig;
pub use errors::{BenchError, Result};
pub use runner::{BackendRunner, BenchResult, BenchTable, Client, Runner};
pub use scenario::Scenario;
pub use validate::validate;
