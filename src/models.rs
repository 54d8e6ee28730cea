//! Data models for profile aggregation.
//!
//! This module contains the entities owned by each backend, the composite
//! profile handed back to callers, and the update request shapes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque customer identifier, the key for every backend lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub u32);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Loyalty points balance for a customer.
pub type LoyaltyPoints = i64;

/// The anchor entity held by the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: CustomerId,
    pub full_name: String,
    /// Cleared by a replace request that carries no phone number.
    pub phone_number: Option<String>,
    pub created_at: NaiveDate,
}

/// Postal address owned by the address backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub id: String,
    pub street: String,
    pub street_number: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl AddressInfo {
    /// Build a new address entity from a request, assigning a fresh id.
    pub fn from_input(input: &AddressInput) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            street: input.street.clone(),
            street_number: input.street_number.clone(),
            city: input.city.clone(),
            state: input.state.clone(),
            zip_code: input.zip_code.clone(),
            country: input.country.clone(),
        }
    }
}

/// A card/account pair owned by the financial backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FinancialInstrument {
    pub id: String,
    pub credit_card_number: String,
    pub iban: String,
}

impl FinancialInstrument {
    /// Build a new instrument from a request, assigning a fresh id.
    pub fn from_input(input: &FinancialInput) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            credit_card_number: input.credit_card_number.clone(),
            iban: input.iban.clone(),
        }
    }
}

/// A purchase as stored by the transaction backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseTransaction {
    pub id: String,
    pub customer_id: CustomerId,
    pub payment_type: String,
    pub amount: Decimal,
    pub created_at: NaiveDate,
}

/// Purchase projection exposed in a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub id: String,
    pub payment_type: String,
    pub amount: Decimal,
    pub created_at: NaiveDate,
}

impl From<&PurchaseTransaction> for TransactionSummary {
    fn from(tx: &PurchaseTransaction) -> Self {
        Self {
            id: tx.id.clone(),
            payment_type: tx.payment_type.clone(),
            amount: tx.amount,
            created_at: tx.created_at,
        }
    }
}

/// The assembled result of a profile read.
///
/// An absent `address` or `loyalty_points` means the owning backend had
/// nothing for this customer. Backend failures never produce a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeProfile {
    pub id: CustomerId,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub created_at: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loyalty_points: Option<LoyaltyPoints>,
    pub financial_instruments: Vec<FinancialInstrument>,
    pub purchase_transactions: Vec<TransactionSummary>,
}

/// Address fields carried by an update request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInput {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub street_number: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub country: String,
}

/// Financial instrument fields carried by an update request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FinancialInput {
    pub credit_card_number: String,
    pub iban: String,
}

/// A request to change some or all mutable aspects of a customer.
///
/// `None` means "do not touch that backend". `Some` (even an empty list)
/// means the corresponding update is dispatched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub financial_info: Option<Vec<FinancialInput>>,
    #[serde(default)]
    pub address: Option<AddressInput>,
}

impl UpdateRequest {
    /// Returns true if the request carries nothing to dispatch.
    pub fn is_empty(&self) -> bool {
        self.phone_number.is_none() && self.financial_info.is_none() && self.address.is_none()
    }
}
