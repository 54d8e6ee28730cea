//! Backend collaborators.
//!
//! Each data kind lives behind its own trait so the aggregation core only
//! sees lookups and replacements keyed by customer id. [`Backends`] is the
//! composition root: it is built once at startup and shared by reference.

pub mod memory;
pub mod seed;

use crate::error::BackendError;
use crate::models::{
    AddressInfo, CustomerId, FinancialInstrument, IdentityRecord, LoyaltyPoints,
    PurchaseTransaction,
};
use std::sync::Arc;

pub use memory::MemoryBackends;
pub use seed::Seeder;

/// Durable keyed store for identity records.
pub trait IdentityStore: Send + Sync {
    fn find(&self, id: CustomerId) -> Result<Option<IdentityRecord>, BackendError>;
    fn save(&self, record: IdentityRecord) -> Result<(), BackendError>;
    /// All records, ordered by id.
    fn all(&self) -> Result<Vec<IdentityRecord>, BackendError>;
}

pub trait AddressBackend: Send + Sync {
    fn lookup(&self, id: CustomerId) -> Result<Option<AddressInfo>, BackendError>;
    fn replace(&self, id: CustomerId, address: AddressInfo) -> Result<(), BackendError>;
}

/// Read-only purchase history. Returns an empty list, never an absent value.
pub trait TransactionBackend: Send + Sync {
    fn lookup(&self, id: CustomerId) -> Result<Vec<PurchaseTransaction>, BackendError>;
}

pub trait FinancialBackend: Send + Sync {
    fn lookup(&self, id: CustomerId) -> Result<Vec<FinancialInstrument>, BackendError>;
    /// Replace the customer's whole instrument set.
    fn replace(
        &self,
        id: CustomerId,
        instruments: Vec<FinancialInstrument>,
    ) -> Result<(), BackendError>;
}

pub trait LoyaltyBackend: Send + Sync {
    fn lookup(&self, id: CustomerId) -> Result<Option<LoyaltyPoints>, BackendError>;
}

/// The set of collaborators the engine and planner work against.
#[derive(Clone)]
pub struct Backends {
    pub identity: Arc<dyn IdentityStore>,
    pub address: Arc<dyn AddressBackend>,
    pub transactions: Arc<dyn TransactionBackend>,
    pub financial: Arc<dyn FinancialBackend>,
    pub loyalty: Arc<dyn LoyaltyBackend>,
}
