//! Core rate resolution abstractions

pub mod asset;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod log;
pub mod oracle;
pub mod query;
pub mod rate;
pub mod task;

// Re-export main types for cleaner imports
pub use asset::{Asset, AssetKind, AssetRegistry, AssetResolver, CurrencyIdentifier};
pub use cache::RateCache;
pub use engine::RateEngine;
pub use error::{OracleError, ResolveError, TaskError};
pub use oracle::{OracleChain, RateOracle};
pub use query::RateQueryRequest;
pub use rate::{Rate, ResolutionResult};
pub use task::{ExecutionMode, QueryOutcome, TaskExecutor, TaskHandle, TaskId, TaskState};
