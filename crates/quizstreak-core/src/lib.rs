//! quizstreak core - session tokens and daily practice statistics.
//!
//! - `auth`: the `SessionManager` that keeps the bearer token valid
//! - `stats`: the `PracticeStatsEngine` tracking counts, goal and streak
//! - `api`: the backend client and its transport seam
//! - `storage`: local key-value persistence
//! - `config`: endpoint and timing configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod shell;
pub mod stats;
pub mod storage;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ApiError, ReqwestTransport, Transport};
pub use auth::{AuthError, AutoRefreshHandle, SessionManager};
pub use config::Config;
pub use shell::{AppShell, NoopShell};
pub use stats::{AggregateStats, PracticeStatsEngine, StatsError, Surface, SyncOutcome};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use time::Clock;
