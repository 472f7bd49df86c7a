//! Engine coordinating submission, supersession and cancellation of searches

pub mod builder;
pub mod config;
pub mod core;
pub mod execution;

pub use builder::EngineBuilder;
pub use config::EngineConfig;
pub use self::core::Engine;
pub use execution::{QueryExecution, ResultCallback};
