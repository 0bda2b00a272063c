//! Practice statistics: per-surface counters, daily goal and streak.
//!
//! Records live in the `KeyValueStore` as JSON under the surface keys. The
//! backend is consulted only for streak values; everything else is owned
//! locally and keeps working offline.

pub mod engine;
pub mod model;

use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

pub use engine::{PracticeStatsEngine, ScrollOutcome, SyncOutcome};
pub use model::{
    AggregateStats, BackendStreaks, Surface, SurfaceStats, DAILY_GOAL_KEY, GOAL_PRESETS,
};

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Unknown practice surface: {0}")]
    UnknownSurface(String),

    #[error("Daily goal must be greater than zero")]
    InvalidGoal,

    #[error("Corrupt stats record under '{key}': {source}")]
    Corrupt {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Backend sync failed: {0}")]
    Backend(#[from] ApiError),
}
