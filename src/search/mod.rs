pub mod cancel;
pub mod error;
pub mod index;
pub mod manager;
pub mod runner;
pub mod types;

pub use cancel::*;
pub use error::*;
pub use index::*;
pub use manager::{Engine, EngineBuilder, EngineConfig, QueryExecution, ResultCallback};
pub use runner::*;
pub use types::*;
