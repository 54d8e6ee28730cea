//! Profile assembly.
//!
//! Pure merge functions. Every read strategy builds profiles from the same
//! `anchor` + `attach_*` steps, applied in the same order, so they cannot
//! disagree on the result.

use crate::models::{
    AddressInfo, CompositeProfile, FinancialInstrument, IdentityRecord, LoyaltyPoints,
    PurchaseTransaction, TransactionSummary,
};

/// Start a profile from its identity record.
pub fn anchor(identity: IdentityRecord) -> CompositeProfile {
    CompositeProfile {
        id: identity.id,
        full_name: identity.full_name,
        phone_number: identity.phone_number,
        created_at: identity.created_at,
        address: None,
        loyalty_points: None,
        financial_instruments: Vec::new(),
        purchase_transactions: Vec::new(),
    }
}

pub fn attach_address(
    mut profile: CompositeProfile,
    address: Option<AddressInfo>,
) -> CompositeProfile {
    profile.address = address;
    profile
}

/// Project purchases, ordered by date then id.
pub fn attach_transactions(
    mut profile: CompositeProfile,
    transactions: Vec<PurchaseTransaction>,
) -> CompositeProfile {
    let mut summaries: Vec<TransactionSummary> =
        transactions.iter().map(TransactionSummary::from).collect();
    summaries.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
    profile.purchase_transactions = summaries;
    profile
}

/// Attach instruments, ordered by instrument id.
pub fn attach_financial(
    mut profile: CompositeProfile,
    mut instruments: Vec<FinancialInstrument>,
) -> CompositeProfile {
    instruments.sort_by(|a, b| a.id.cmp(&b.id));
    profile.financial_instruments = instruments;
    profile
}

pub fn attach_loyalty(
    mut profile: CompositeProfile,
    points: Option<LoyaltyPoints>,
) -> CompositeProfile {
    profile.loyalty_points = points;
    profile
}

/// Merge every channel into a profile.
///
/// Returns `None` when the identity anchor is absent, whatever the side
/// channels hold. Absent side channels leave their fields empty.
pub fn assemble(
    identity: Option<IdentityRecord>,
    address: Option<AddressInfo>,
    transactions: Vec<PurchaseTransaction>,
    financial: Vec<FinancialInstrument>,
    loyalty: Option<LoyaltyPoints>,
) -> Option<CompositeProfile> {
    let profile = anchor(identity?);
    let profile = attach_address(profile, address);
    let profile = attach_transactions(profile, transactions);
    let profile = attach_financial(profile, financial);
    Some(attach_loyalty(profile, loyalty))
}
