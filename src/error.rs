//! Error types for backend calls and the aggregation core.

use crate::aggregate::TaskKind;
use crate::models::CustomerId;
use thiserror::Error;

/// Which collaborator a call was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum BackendKind {
    Identity,
    Address,
    Transactions,
    Financial,
    Loyalty,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Identity => write!(f, "identity"),
            BackendKind::Address => write!(f, "address"),
            BackendKind::Transactions => write!(f, "transactions"),
            BackendKind::Financial => write!(f, "financial"),
            BackendKind::Loyalty => write!(f, "loyalty"),
        }
    }
}

impl From<BackendKind> for TaskKind {
    fn from(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Identity => TaskKind::Identity,
            BackendKind::Address => TaskKind::Address,
            BackendKind::Transactions => TaskKind::Transactions,
            BackendKind::Financial => TaskKind::Financial,
            BackendKind::Loyalty => TaskKind::Loyalty,
        }
    }
}

/// A collaborator call terminated abnormally.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{backend} backend failed for customer {customer_id}: {reason}")]
pub struct BackendError {
    pub backend: BackendKind,
    pub customer_id: CustomerId,
    pub reason: String,
}

impl BackendError {
    pub fn new(backend: BackendKind, customer_id: CustomerId, reason: impl Into<String>) -> Self {
        Self {
            backend,
            customer_id,
            reason: reason.into(),
        }
    }
}

/// Failure observed by the fan-out/fan-in engine.
///
/// A lookup that finds nothing is not an error; it is an absent value.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// A dispatched task returned an error.
    #[error("{task} task failed")]
    TaskFailed {
        task: TaskKind,
        #[source]
        source: BackendError,
    },

    /// A dispatched task panicked before producing a value.
    #[error("{task} task panicked")]
    TaskPanicked { task: TaskKind },

    /// A replace request is missing a section the replace policy requires.
    #[error("{task} task cannot replace without {field}")]
    MissingReplaceField { task: TaskKind, field: &'static str },
}

/// A failed call becomes a failure of the task named by its backend.
impl From<BackendError> for ProfileError {
    fn from(source: BackendError) -> Self {
        ProfileError::TaskFailed {
            task: source.backend.into(),
            source,
        }
    }
}

impl ProfileError {
    /// The task the failure originated from.
    pub fn task(&self) -> TaskKind {
        match self {
            ProfileError::TaskFailed { task, .. }
            | ProfileError::TaskPanicked { task }
            | ProfileError::MissingReplaceField { task, .. } => *task,
        }
    }
}
