//! Profile aggregation core.
//!
//! The planner turns update requests into task sets, the engine fans tasks
//! out to the blocking pool and joins them, and the assembler merges read
//! results into a [`CompositeProfile`](crate::models::CompositeProfile).
//! A sequential read is kept as the baseline the concurrent joins are
//! measured against.

pub mod assembler;
pub mod engine;
pub mod planner;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use engine::{build_runtime, ProfileEngine};

/// Identity tag of a dispatched task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Identity,
    Address,
    Transactions,
    Financial,
    Loyalty,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Identity => write!(f, "identity"),
            TaskKind::Address => write!(f, "address"),
            TaskKind::Transactions => write!(f, "transactions"),
            TaskKind::Financial => write!(f, "financial"),
            TaskKind::Loyalty => write!(f, "loyalty"),
        }
    }
}

/// How the read path joins its lookups.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum JoinStrategy {
    /// Fold each lookup into the running profile in a fixed order
    #[default]
    Incremental,
    /// Wait for every lookup, then assemble once
    Barrier,
    /// One blocking task calling each backend in turn
    Sequential,
}

impl fmt::Display for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinStrategy::Incremental => write!(f, "incremental"),
            JoinStrategy::Barrier => write!(f, "barrier"),
            JoinStrategy::Sequential => write!(f, "sequential"),
        }
    }
}
