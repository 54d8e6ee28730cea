//! In-memory backend stubs.
//!
//! Every stub is a keyed map guarded by an `RwLock`, with a fixed simulated
//! latency that blocks the calling thread. Stubs count their calls and can
//! be switched into a failing mode, which is how tests observe dispatch and
//! inject task failures.

use super::{
    AddressBackend, Backends, FinancialBackend, IdentityStore, LoyaltyBackend,
    TransactionBackend,
};
use crate::config::LatencyConfig;
use crate::error::{BackendError, BackendKind};
use crate::models::{
    AddressInfo, CustomerId, FinancialInstrument, IdentityRecord, LoyaltyPoints,
    PurchaseTransaction,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info};

/// A latency-bearing keyed store for one data kind.
pub struct MemoryBackend<T> {
    kind: BackendKind,
    latency: Duration,
    entries: RwLock<HashMap<CustomerId, T>>,
    lookups: AtomicUsize,
    updates: AtomicUsize,
    failing: AtomicBool,
}

impl<T: Clone> MemoryBackend<T> {
    pub fn new(kind: BackendKind, latency: Duration) -> Self {
        Self {
            kind,
            latency,
            entries: RwLock::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Seed an entry without latency or instrumentation.
    ///
    /// Seeding recovers a poisoned lock rather than dropping the entry.
    pub fn insert(&self, id: CustomerId, value: T) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, value);
    }

    /// Remove an entry without latency or instrumentation.
    #[cfg(test)]
    pub fn remove(&self, id: CustomerId) -> Option<T> {
        self.entries.write().ok()?.remove(&id)
    }

    /// Read an entry without latency or instrumentation.
    #[cfg(test)]
    pub fn peek(&self, id: CustomerId) -> Option<T> {
        self.entries.read().ok()?.get(&id).cloned()
    }

    /// Number of lookup calls served so far.
    pub fn lookup_calls(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of update calls served so far.
    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn error(&self, id: CustomerId, reason: &str) -> BackendError {
        BackendError::new(self.kind, id, reason)
    }

    /// Simulate the remote round trip and apply failure injection.
    fn round_trip(&self, id: CustomerId) -> Result<(), BackendError> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(self.error(id, "service unavailable"));
        }
        Ok(())
    }

    fn get(&self, id: CustomerId) -> Result<Option<T>, BackendError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.round_trip(id)?;
        let entries = self
            .entries
            .read()
            .map_err(|_| self.error(id, "store lock poisoned"))?;
        Ok(entries.get(&id).cloned())
    }

    fn put(&self, id: CustomerId, value: T) -> Result<(), BackendError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.round_trip(id)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| self.error(id, "store lock poisoned"))?;
        entries.insert(id, value);
        Ok(())
    }
}

impl IdentityStore for MemoryBackend<IdentityRecord> {
    fn find(&self, id: CustomerId) -> Result<Option<IdentityRecord>, BackendError> {
        debug!("Finding customer {}", id);
        self.get(id)
    }

    fn save(&self, record: IdentityRecord) -> Result<(), BackendError> {
        debug!("Saving customer {}", record.id);
        self.put(record.id, record)
    }

    fn all(&self) -> Result<Vec<IdentityRecord>, BackendError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| self.error(CustomerId(0), "store lock poisoned"))?;
        let mut records: Vec<IdentityRecord> = entries.values().cloned().collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }
}

impl AddressBackend for MemoryBackend<AddressInfo> {
    fn lookup(&self, id: CustomerId) -> Result<Option<AddressInfo>, BackendError> {
        info!("Getting address by customer id {}", id);
        self.get(id)
    }

    fn replace(&self, id: CustomerId, address: AddressInfo) -> Result<(), BackendError> {
        info!("Updating address by customer id {}", id);
        self.put(id, address)
    }
}

impl TransactionBackend for MemoryBackend<Vec<PurchaseTransaction>> {
    fn lookup(&self, id: CustomerId) -> Result<Vec<PurchaseTransaction>, BackendError> {
        info!("Getting purchase transactions by customer id {}", id);
        Ok(self.get(id)?.unwrap_or_default())
    }
}

impl FinancialBackend for MemoryBackend<Vec<FinancialInstrument>> {
    fn lookup(&self, id: CustomerId) -> Result<Vec<FinancialInstrument>, BackendError> {
        info!("Getting financial info by customer id {}", id);
        Ok(self.get(id)?.unwrap_or_default())
    }

    fn replace(
        &self,
        id: CustomerId,
        instruments: Vec<FinancialInstrument>,
    ) -> Result<(), BackendError> {
        info!("Updating financial info by customer id {}", id);
        // Instruments form a set keyed by instrument id.
        let mut seen = HashSet::new();
        let unique: Vec<FinancialInstrument> = instruments
            .into_iter()
            .filter(|instrument| seen.insert(instrument.id.clone()))
            .collect();
        self.put(id, unique)
    }
}

impl LoyaltyBackend for MemoryBackend<LoyaltyPoints> {
    fn lookup(&self, id: CustomerId) -> Result<Option<LoyaltyPoints>, BackendError> {
        info!("Getting loyalty points by customer id {}", id);
        self.get(id)
    }
}

/// Concrete handles to every in-memory stub.
///
/// Keeps the typed stubs reachable for seeding and instrumentation while
/// [`MemoryBackends::backends`] hands out the trait-object view.
#[derive(Clone)]
pub struct MemoryBackends {
    pub identity: Arc<MemoryBackend<IdentityRecord>>,
    pub address: Arc<MemoryBackend<AddressInfo>>,
    pub transactions: Arc<MemoryBackend<Vec<PurchaseTransaction>>>,
    pub financial: Arc<MemoryBackend<Vec<FinancialInstrument>>>,
    pub loyalty: Arc<MemoryBackend<LoyaltyPoints>>,
}

impl MemoryBackends {
    pub fn new(latency: &LatencyConfig) -> Self {
        Self {
            identity: Arc::new(MemoryBackend::new(
                BackendKind::Identity,
                Duration::from_millis(latency.identity_ms),
            )),
            address: Arc::new(MemoryBackend::new(
                BackendKind::Address,
                Duration::from_millis(latency.address_ms),
            )),
            transactions: Arc::new(MemoryBackend::new(
                BackendKind::Transactions,
                Duration::from_millis(latency.transactions_ms),
            )),
            financial: Arc::new(MemoryBackend::new(
                BackendKind::Financial,
                Duration::from_millis(latency.financial_ms),
            )),
            loyalty: Arc::new(MemoryBackend::new(
                BackendKind::Loyalty,
                Duration::from_millis(latency.loyalty_ms),
            )),
        }
    }

    pub fn backends(&self) -> Backends {
        Backends {
            identity: self.identity.clone(),
            address: self.address.clone(),
            transactions: self.transactions.clone(),
            financial: self.financial.clone(),
            loyalty: self.loyalty.clone(),
        }
    }

    /// Switch one backend into failing mode.
    pub fn fail(&self, kind: BackendKind) {
        match kind {
            BackendKind::Identity => self.identity.set_failing(true),
            BackendKind::Address => self.address.set_failing(true),
            BackendKind::Transactions => self.transactions.set_failing(true),
            BackendKind::Financial => self.financial.set_failing(true),
            BackendKind::Loyalty => self.loyalty.set_failing(true),
        }
    }

    /// One line of lookup/update counts per backend.
    pub fn call_summary(&self) -> String {
        format!(
            "identity {}/{}, address {}/{}, transactions {}/0, financial {}/{}, loyalty {}/0",
            self.identity.lookup_calls(),
            self.identity.update_calls(),
            self.address.lookup_calls(),
            self.address.update_calls(),
            self.transactions.lookup_calls(),
            self.financial.lookup_calls(),
            self.financial.update_calls(),
            self.loyalty.lookup_calls(),
        )
    }

    /// Total lookup calls across the side-channel backends.
    #[cfg(test)]
    pub fn side_channel_lookups(&self) -> usize {
        self.address.lookup_calls()
            + self.transactions.lookup_calls()
            + self.financial.lookup_calls()
            + self.loyalty.lookup_calls()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn no_latency() -> LatencyConfig {
        LatencyConfig::uniform(0)
    }

    fn instrument(id: &str) -> FinancialInstrument {
        FinancialInstrument {
            id: id.to_string(),
            credit_card_number: format!("4000-{}", id),
            iban: format!("DE00{}", id),
        }
    }

    #[test]
    fn test_lookup_counts_and_returns_entry() {
        let stubs = MemoryBackends::new(&no_latency());
        stubs.loyalty.insert(CustomerId(1), 120);

        assert_eq!(LoyaltyBackend::lookup(&*stubs.loyalty, CustomerId(1)).unwrap(), Some(120));
        assert_eq!(LoyaltyBackend::lookup(&*stubs.loyalty, CustomerId(2)).unwrap(), None);
        assert_eq!(stubs.loyalty.lookup_calls(), 2);
        assert_eq!(stubs.loyalty.update_calls(), 0);
    }

    #[test]
    fn test_missing_list_channels_are_empty() {
        let stubs = MemoryBackends::new(&no_latency());
        assert!(TransactionBackend::lookup(&*stubs.transactions, CustomerId(9))
            .unwrap()
            .is_empty());
        assert!(FinancialBackend::lookup(&*stubs.financial, CustomerId(9))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_failing_stub_returns_backend_error() {
        let stubs = MemoryBackends::new(&no_latency());
        stubs.address.set_failing(true);

        let err = AddressBackend::lookup(&*stubs.address, CustomerId(4)).unwrap_err();
        assert_eq!(err.backend, BackendKind::Address);
        assert_eq!(err.customer_id, CustomerId(4));
        assert_eq!(stubs.address.lookup_calls(), 1);

        stubs.address.set_failing(false);
        assert!(AddressBackend::lookup(&*stubs.address, CustomerId(4)).is_ok());
    }

    #[test]
    fn test_financial_replace_deduplicates_by_id() {
        let stubs = MemoryBackends::new(&no_latency());
        FinancialBackend::replace(
            &*stubs.financial,
            CustomerId(3),
            vec![instrument("a"), instrument("b"), instrument("a")],
        )
        .unwrap();

        let stored = stubs.financial.peek(CustomerId(3)).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stubs.financial.update_calls(), 1);
    }

    #[test]
    fn test_identity_all_is_ordered_by_id() {
        let stubs = MemoryBackends::new(&no_latency());
        for id in [3, 1, 2] {
            stubs.identity.insert(
                CustomerId(id),
                IdentityRecord {
                    id: CustomerId(id),
                    full_name: format!("Customer {}", id),
                    phone_number: None,
                    created_at: NaiveDate::from_ymd_opt(2021, 5, 1).unwrap(),
                },
            );
        }

        let ids: Vec<u32> = stubs.identity.all().unwrap().iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_fail_by_kind_and_call_summary() {
        let stubs = MemoryBackends::new(&no_latency());
        stubs.fail(BackendKind::Transactions);

        assert!(TransactionBackend::lookup(&*stubs.transactions, CustomerId(1)).is_err());
        assert!(AddressBackend::lookup(&*stubs.address, CustomerId(1)).is_ok());
        assert_eq!(
            stubs.call_summary(),
            "identity 0/0, address 1/0, transactions 1/0, financial 0/0, loyalty 0/0"
        );
    }

    #[test]
    fn test_insert_survives_poisoned_lock() {
        let stub = Arc::new(MemoryBackend::<LoyaltyPoints>::new(
            BackendKind::Loyalty,
            Duration::ZERO,
        ));
        let poisoner = stub.clone();
        let result = std::thread::spawn(move || {
            let _guard = poisoner.entries.write().unwrap();
            panic!("writer crashed while holding the lock");
        })
        .join();
        assert!(result.is_err());
        assert!(stub.entries.is_poisoned());

        stub.insert(CustomerId(3), 75);
        let entries = stub.entries.read().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(entries.get(&CustomerId(3)), Some(&75));
    }

    #[test]
    fn test_latency_blocks_calling_thread() {
        let stubs = MemoryBackends::new(&LatencyConfig::uniform(20));
        let start = std::time::Instant::now();
        LoyaltyBackend::lookup(&*stubs.loyalty, CustomerId(1)).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
