//! Update planning.
//!
//! Turns an [`UpdateRequest`] into the set of backend writes to dispatch.
//! Two policies exist:
//!
//! - `Sparse` builds a task only for fields present in the request. An
//!   absent field creates no task, makes no call and logs nothing.
//! - `Replace` always builds all three tasks. A missing address or
//!   financial section makes that task fail when it runs.

use super::TaskKind;
use crate::backend::Backends;
use crate::error::ProfileError;
use crate::models::{
    AddressInfo, AddressInput, CustomerId, FinancialInput, FinancialInstrument, UpdateRequest,
};
use tracing::{debug, info};

/// Which fields of a request drive dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Overwrite identity phone, address and financial unconditionally.
    Replace,
    /// Touch only the backends whose field is present.
    Sparse,
}

type Work = Box<dyn FnOnce() -> Result<(), ProfileError> + Send + 'static>;

/// A zero-argument unit of write work tagged with its target.
pub struct UpdateTask {
    kind: TaskKind,
    work: Work,
}

impl UpdateTask {
    fn new<F>(kind: TaskKind, work: F) -> Self
    where
        F: FnOnce() -> Result<(), ProfileError> + Send + 'static,
    {
        Self {
            kind,
            work: Box::new(work),
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Run the task on the current thread.
    pub fn run(self) -> Result<(), ProfileError> {
        (self.work)()
    }
}

impl std::fmt::Debug for UpdateTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateTask").field("kind", &self.kind).finish()
    }
}

/// The tasks to dispatch for one update request.
#[derive(Debug)]
pub struct UpdatePlan {
    pub customer_id: CustomerId,
    pub policy: UpdatePolicy,
    pub tasks: Vec<UpdateTask>,
}

impl UpdatePlan {
    /// Tags of the planned tasks, in dispatch order.
    pub fn kinds(&self) -> Vec<TaskKind> {
        self.tasks.iter().map(UpdateTask::kind).collect()
    }
}

/// Build the task set for `request` under `policy`.
pub fn plan_update(
    backends: &Backends,
    customer_id: CustomerId,
    request: &UpdateRequest,
    policy: UpdatePolicy,
) -> UpdatePlan {
    let tasks = match policy {
        UpdatePolicy::Replace => {
            info!("Replacing customer {}", customer_id);
            vec![
                phone_task(backends, customer_id, request.phone_number.clone()),
                financial_task(backends, customer_id, request.financial_info.clone()),
                address_task(backends, customer_id, request.address.clone()),
            ]
        }
        UpdatePolicy::Sparse => {
            info!("Updating customer {}", customer_id);
            let mut tasks = Vec::with_capacity(3);
            if let Some(phone) = &request.phone_number {
                info!("Received a phone number, updating customer");
                tasks.push(phone_task(backends, customer_id, Some(phone.clone())));
            }
            if let Some(financial) = &request.financial_info {
                info!("Received financial info, updating it");
                tasks.push(financial_task(backends, customer_id, Some(financial.clone())));
            }
            if let Some(address) = &request.address {
                info!("Received an address, updating it");
                tasks.push(address_task(backends, customer_id, Some(address.clone())));
            }
            tasks
        }
    };

    UpdatePlan {
        customer_id,
        policy,
        tasks,
    }
}

/// Set the phone number on an existing identity; unknown ids are skipped.
fn phone_task(backends: &Backends, id: CustomerId, phone: Option<String>) -> UpdateTask {
    let store = backends.identity.clone();
    UpdateTask::new(TaskKind::Identity, move || {
        match store.find(id)? {
            Some(mut record) => {
                record.phone_number = phone;
                Ok(store.save(record)?)
            }
            None => {
                debug!("No customer {}, skipping phone number update", id);
                Ok(())
            }
        }
    })
}

fn financial_task(
    backends: &Backends,
    id: CustomerId,
    financial: Option<Vec<FinancialInput>>,
) -> UpdateTask {
    let backend = backends.financial.clone();
    UpdateTask::new(TaskKind::Financial, move || {
        let inputs = financial.ok_or(ProfileError::MissingReplaceField {
            task: TaskKind::Financial,
            field: "financial_info",
        })?;
        let instruments: Vec<FinancialInstrument> =
            inputs.iter().map(FinancialInstrument::from_input).collect();
        Ok(backend.replace(id, instruments)?)
    })
}

fn address_task(
    backends: &Backends,
    id: CustomerId,
    address: Option<AddressInput>,
) -> UpdateTask {
    let backend = backends.address.clone();
    UpdateTask::new(TaskKind::Address, move || {
        let input = address.ok_or(ProfileError::MissingReplaceField {
            task: TaskKind::Address,
            field: "address",
        })?;
        Ok(backend.replace(id, AddressInfo::from_input(&input))?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackends;
    use crate::config::LatencyConfig;
    use crate::models::IdentityRecord;
    use chrono::NaiveDate;

    fn stubs_with_customer(id: u32) -> MemoryBackends {
        let stubs = MemoryBackends::new(&LatencyConfig::uniform(0));
        stubs.identity.insert(
            CustomerId(id),
            IdentityRecord {
                id: CustomerId(id),
                full_name: "Leila Haddad".to_string(),
                phone_number: Some("555-000-0000".to_string()),
                created_at: NaiveDate::from_ymd_opt(2018, 8, 8).unwrap(),
            },
        );
        stubs
    }

    fn card() -> FinancialInput {
        FinancialInput {
            credit_card_number: "5500-0000-0000-0004".to_string(),
            iban: "GB82WEST12345698765432".to_string(),
        }
    }

    #[test]
    fn test_sparse_plans_only_present_fields() {
        let stubs = stubs_with_customer(1);
        let request = UpdateRequest {
            phone_number: Some("555-123-4567".to_string()),
            ..Default::default()
        };

        let plan = plan_update(&stubs.backends(), CustomerId(1), &request, UpdatePolicy::Sparse);
        assert_eq!(plan.kinds(), vec![TaskKind::Identity]);
    }

    #[test]
    fn test_sparse_empty_collection_still_dispatches() {
        let stubs = stubs_with_customer(1);
        let request = UpdateRequest {
            financial_info: Some(vec![]),
            address: Some(AddressInput::default()),
            ..Default::default()
        };

        let plan = plan_update(&stubs.backends(), CustomerId(1), &request, UpdatePolicy::Sparse);
        assert_eq!(plan.kinds(), vec![TaskKind::Financial, TaskKind::Address]);
    }

    #[test]
    fn test_sparse_empty_request_plans_nothing() {
        let stubs = stubs_with_customer(1);
        let plan = plan_update(
            &stubs.backends(),
            CustomerId(1),
            &UpdateRequest::default(),
            UpdatePolicy::Sparse,
        );
        assert!(plan.tasks.is_empty());
    }

    #[test]
    fn test_replace_plans_all_three() {
        let stubs = stubs_with_customer(1);
        let plan = plan_update(
            &stubs.backends(),
            CustomerId(1),
            &UpdateRequest::default(),
            UpdatePolicy::Replace,
        );
        assert_eq!(
            plan.kinds(),
            vec![TaskKind::Identity, TaskKind::Financial, TaskKind::Address]
        );
    }

    #[test]
    fn test_planning_makes_no_calls() {
        let stubs = stubs_with_customer(1);
        let request = UpdateRequest {
            phone_number: Some("555-999-9999".to_string()),
            financial_info: Some(vec![card()]),
            address: Some(AddressInput::default()),
        };
        let _plan = plan_update(&stubs.backends(), CustomerId(1), &request, UpdatePolicy::Replace);

        assert_eq!(stubs.identity.lookup_calls(), 0);
        assert_eq!(stubs.financial.update_calls(), 0);
        assert_eq!(stubs.address.update_calls(), 0);
    }

    #[test]
    fn test_phone_task_skips_unknown_customer() {
        let stubs = stubs_with_customer(1);
        let request = UpdateRequest {
            phone_number: Some("555-111-2222".to_string()),
            ..Default::default()
        };
        let plan = plan_update(&stubs.backends(), CustomerId(42), &request, UpdatePolicy::Sparse);

        for task in plan.tasks {
            assert!(task.run().is_ok());
        }
        assert_eq!(stubs.identity.lookup_calls(), 1);
        assert_eq!(stubs.identity.update_calls(), 0);
        assert!(stubs.identity.peek(CustomerId(42)).is_none());
    }

    #[test]
    fn test_replace_task_without_address_fails() {
        let stubs = stubs_with_customer(1);
        let request = UpdateRequest {
            financial_info: Some(vec![card()]),
            ..Default::default()
        };
        let plan = plan_update(&stubs.backends(), CustomerId(1), &request, UpdatePolicy::Replace);

        let results: Vec<(TaskKind, bool)> = plan
            .tasks
            .into_iter()
            .map(|task| (task.kind(), task.run().is_ok()))
            .collect();
        assert_eq!(
            results,
            vec![
                (TaskKind::Identity, true),
                (TaskKind::Financial, true),
                (TaskKind::Address, false),
            ]
        );
        // Replace without a phone clears it.
        assert_eq!(stubs.identity.peek(CustomerId(1)).unwrap().phone_number, None);
    }
}
