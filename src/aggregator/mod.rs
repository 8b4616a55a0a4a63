//! Aggregation engine (C5) and subscriber registry (C6).

mod consolidate;
mod engine;
mod stats;

pub use engine::AggregationEngine;
pub use stats::{EngineStats, EngineStatsSnapshot};
