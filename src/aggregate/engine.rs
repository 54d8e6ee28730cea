//! Fan-out/fan-in engine.
//!
//! Every backend call runs as a blocking task on the runtime's blocking
//! pool. Reads can be joined two ways:
//!
//! - incremental: the identity result seeds an accumulator which is then
//!   combined with address, transactions, financial and loyalty, in that
//!   order, each step awaiting only the task it folds in;
//! - barrier: every lookup is awaited first, then the profile is assembled
//!   in one step;
//! - sequential: a single blocking task calls identity, then each side
//!   channel in turn, and skips the side channels for an unknown id.
//!
//! All paths share the assembler steps and return the same value. Every
//! spawned task is awaited before the call returns, including after a
//! failure has already been observed.

use super::assembler;
use super::planner::{plan_update, UpdatePlan, UpdatePolicy};
use super::{JoinStrategy, TaskKind};
use crate::backend::Backends;
use crate::config::PoolConfig;
use crate::error::{BackendError, ProfileError};
use crate::models::{
    AddressInfo, CompositeProfile, CustomerId, FinancialInstrument, IdentityRecord,
    LoyaltyPoints, PurchaseTransaction, UpdateRequest,
};
use futures::future::join_all;
use std::time::Instant;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Build the runtime whose blocking pool executes backend calls.
pub fn build_runtime(pool: &PoolConfig) -> std::io::Result<Runtime> {
    let threads = pool.worker_threads.max(1);
    Builder::new_multi_thread()
        .worker_threads(threads)
        .max_blocking_threads(threads)
        .thread_name("profile-worker")
        .enable_all()
        .build()
}

/// A task running on the blocking pool.
struct TaskHandle<T> {
    kind: TaskKind,
    handle: JoinHandle<Result<T, ProfileError>>,
}

impl<T: Send + 'static> TaskHandle<T> {
    fn spawn<F>(kind: TaskKind, work: F) -> Self
    where
        F: FnOnce() -> Result<T, ProfileError> + Send + 'static,
    {
        Self {
            kind,
            handle: tokio::task::spawn_blocking(work),
        }
    }

    fn spawn_lookup<F>(kind: TaskKind, call: F) -> Self
    where
        F: FnOnce() -> Result<T, BackendError> + Send + 'static,
    {
        Self::spawn(kind, move || {
            call().map_err(|source| ProfileError::TaskFailed { task: kind, source })
        })
    }

    /// Wait for the task; a panic counts as a task failure.
    async fn join(self) -> Result<T, ProfileError> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) => {
                warn!("{} task did not complete: {}", self.kind, err);
                Err(ProfileError::TaskPanicked { task: self.kind })
            }
        }
    }
}

/// The five lookups of one profile read, already dispatched.
struct Lookups {
    identity: TaskHandle<Option<IdentityRecord>>,
    address: TaskHandle<Option<AddressInfo>>,
    transactions: TaskHandle<Vec<PurchaseTransaction>>,
    financial: TaskHandle<Vec<FinancialInstrument>>,
    loyalty: TaskHandle<Option<LoyaltyPoints>>,
}

type Accumulator = Result<Option<CompositeProfile>, ProfileError>;

/// Fold one more lookup into the running profile.
///
/// `next` is always awaited so that no task outlives the read, but once
/// the accumulator holds an error nothing else is merged.
async fn combine<T, F>(acc: Accumulator, next: TaskHandle<T>, step: F) -> Accumulator
where
    T: Send + 'static,
    F: FnOnce(CompositeProfile, T) -> CompositeProfile,
{
    let value = next.join().await;
    let profile = acc?;
    let value = value?;
    Ok(profile.map(|profile| step(profile, value)))
}

fn read_in_turn(
    backends: &Backends,
    id: CustomerId,
) -> Result<Option<CompositeProfile>, ProfileError> {
    let Some(identity) = backends.identity.find(id)? else {
        debug!("No customer {}, skipping side channels", id);
        return Ok(None);
    };

    let profile = assembler::anchor(identity);
    let profile = assembler::attach_address(profile, backends.address.lookup(id)?);
    let profile = assembler::attach_transactions(profile, backends.transactions.lookup(id)?);
    let profile = assembler::attach_financial(profile, backends.financial.lookup(id)?);
    let profile = assembler::attach_loyalty(profile, backends.loyalty.lookup(id)?);
    Ok(Some(profile))
}

/// Runs reads and writes against a set of backends.
#[derive(Clone)]
pub struct ProfileEngine {
    backends: Backends,
}

impl ProfileEngine {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    /// Read a profile using the given join discipline.
    pub async fn fetch_profile(
        &self,
        id: CustomerId,
        strategy: JoinStrategy,
    ) -> Result<Option<CompositeProfile>, ProfileError> {
        match strategy {
            JoinStrategy::Incremental => self.fetch_incremental(id).await,
            JoinStrategy::Barrier => self.fetch_barrier(id).await,
            JoinStrategy::Sequential => self.fetch_sequential(id).await,
        }
    }

    /// Read a profile, folding results pairwise in a fixed order.
    pub async fn fetch_incremental(
        &self,
        id: CustomerId,
    ) -> Result<Option<CompositeProfile>, ProfileError> {
        info!("Getting customer by id {}", id);
        let start = Instant::now();
        let lookups = self.dispatch_lookups(id);

        let acc = lookups
            .identity
            .join()
            .await
            .map(|identity| identity.map(assembler::anchor));
        let acc = combine(acc, lookups.address, assembler::attach_address).await;
        let acc = combine(acc, lookups.transactions, assembler::attach_transactions).await;
        let acc = combine(acc, lookups.financial, assembler::attach_financial).await;
        let acc = combine(acc, lookups.loyalty, assembler::attach_loyalty).await;

        debug!("Incremental join for customer {} took {:?}", id, start.elapsed());
        acc
    }

    /// Read a profile, waiting for every lookup before assembling.
    pub async fn fetch_barrier(
        &self,
        id: CustomerId,
    ) -> Result<Option<CompositeProfile>, ProfileError> {
        info!("Getting customer by id {} using a barrier join", id);
        let start = Instant::now();
        let lookups = self.dispatch_lookups(id);

        let (identity, address, transactions, financial, loyalty) = tokio::join!(
            lookups.identity.join(),
            lookups.address.join(),
            lookups.transactions.join(),
            lookups.financial.join(),
            lookups.loyalty.join()
        );
        debug!("Barrier for customer {} reached after {:?}", id, start.elapsed());

        Ok(assembler::assemble(
            identity?,
            address?,
            transactions?,
            financial?,
            loyalty?,
        ))
    }

    /// Read a profile one backend call at a time on a single blocking task.
    ///
    /// Stops at the first failing call. A panic is reported against the
    /// identity task, which owns the whole read.
    pub async fn fetch_sequential(
        &self,
        id: CustomerId,
    ) -> Result<Option<CompositeProfile>, ProfileError> {
        info!("Getting customer by id {} sequentially", id);
        let start = Instant::now();
        let backends = self.backends.clone();

        let profile = TaskHandle::spawn(TaskKind::Identity, move || read_in_turn(&backends, id))
            .join()
            .await;

        debug!("Sequential read for customer {} took {:?}", id, start.elapsed());
        profile
    }

    /// All identity records, ordered by id.
    pub async fn list_customers(&self) -> Result<Vec<IdentityRecord>, ProfileError> {
        info!("Getting all customers");
        let store = self.backends.identity.clone();
        TaskHandle::spawn_lookup(TaskKind::Identity, move || store.all())
            .join()
            .await
    }

    /// Apply only the fields present in `request`.
    pub async fn update_customer(
        &self,
        id: CustomerId,
        request: &UpdateRequest,
    ) -> Result<(), ProfileError> {
        self.apply(plan_update(&self.backends, id, request, UpdatePolicy::Sparse))
            .await
    }

    /// Overwrite phone, financial and address from `request`.
    pub async fn replace_customer(
        &self,
        id: CustomerId,
        request: &UpdateRequest,
    ) -> Result<(), ProfileError> {
        self.apply(plan_update(&self.backends, id, request, UpdatePolicy::Replace))
            .await
    }

    /// Run every planned write concurrently and wait for all of them.
    ///
    /// Returns the first failure in plan order.
    pub async fn apply(&self, plan: UpdatePlan) -> Result<(), ProfileError> {
        let customer_id = plan.customer_id;
        debug!(
            "{:?} update of customer {} dispatches {:?}",
            plan.policy,
            customer_id,
            plan.kinds()
        );
        let handles: Vec<TaskHandle<()>> = plan
            .tasks
            .into_iter()
            .map(|task| TaskHandle::spawn(task.kind(), move || task.run()))
            .collect();

        let outcomes = join_all(handles.into_iter().map(TaskHandle::join)).await;

        let mut first_error = None;
        for err in outcomes.into_iter().filter_map(Result::err) {
            warn!("{} update of customer {} failed: {}", err.task(), customer_id, err);
            if first_error.is_none() {
                first_error = Some(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                info!("Customer {} updated successfully", customer_id);
                Ok(())
            }
        }
    }

    fn dispatch_lookups(&self, id: CustomerId) -> Lookups {
        let identity = self.backends.identity.clone();
        let address = self.backends.address.clone();
        let transactions = self.backends.transactions.clone();
        let financial = self.backends.financial.clone();
        let loyalty = self.backends.loyalty.clone();

        Lookups {
            identity: TaskHandle::spawn_lookup(TaskKind::Identity, move || identity.find(id)),
            address: TaskHandle::spawn_lookup(TaskKind::Address, move || address.lookup(id)),
            transactions: TaskHandle::spawn_lookup(TaskKind::Transactions, move || {
                transactions.lookup(id)
            }),
            financial: TaskHandle::spawn_lookup(TaskKind::Financial, move || {
                financial.lookup(id)
            }),
            loyalty: TaskHandle::spawn_lookup(TaskKind::Loyalty, move || loyalty.lookup(id)),
        }
    }
}
