//! Profile output generation.
//!
//! Renders composite profiles and customer listings as plain text or JSON.

use crate::models::{CompositeProfile, IdentityRecord};
use anyhow::Result;

/// Generate a complete text rendering of a profile.
pub fn generate_profile_text(profile: &CompositeProfile) -> String {
    let mut output = String::new();

    output.push_str(&generate_identity_section(profile));
    output.push_str(&generate_address_section(profile));
    output.push_str(&generate_financial_section(profile));
    output.push_str(&generate_transactions_section(profile));

    output
}

/// Generate the identity section.
fn generate_identity_section(profile: &CompositeProfile) -> String {
    let mut section = String::new();

    section.push_str(&format!("Customer #{}: {}\n", profile.id, profile.full_name));
    section.push_str(&format!(
        "  Phone:          {}\n",
        profile.phone_number.as_deref().unwrap_or("-")
    ));
    section.push_str(&format!(
        "  Customer since: {}\n",
        profile.created_at.format("%Y-%m-%d")
    ));
    match profile.loyalty_points {
        Some(points) => section.push_str(&format!("  Loyalty points: {}\n", points)),
        None => section.push_str("  Loyalty points: -\n"),
    }
    section.push('\n');

    section
}

fn generate_address_section(profile: &CompositeProfile) -> String {
    let mut section = String::from("Address\n");

    match &profile.address {
        Some(address) => {
            section.push_str(&format!(
                "  {} {}\n  {}, {} {}\n  {}\n",
                address.street_number,
                address.street,
                address.city,
                address.state,
                address.zip_code,
                address.country
            ));
        }
        None => section.push_str("  (none on file)\n"),
    }
    section.push('\n');

    section
}

fn generate_financial_section(profile: &CompositeProfile) -> String {
    let mut section = format!(
        "Financial instruments ({})\n",
        profile.financial_instruments.len()
    );

    for instrument in &profile.financial_instruments {
        section.push_str(&format!(
            "  card {}  iban {}\n",
            instrument.credit_card_number, instrument.iban
        ));
    }
    section.push('\n');

    section
}

fn generate_transactions_section(profile: &CompositeProfile) -> String {
    let mut section = format!(
        "Purchase transactions ({})\n",
        profile.purchase_transactions.len()
    );

    for tx in &profile.purchase_transactions {
        section.push_str(&format!(
            "  {}  {:<18} {:>10}\n",
            tx.created_at.format("%Y-%m-%d"),
            tx.payment_type,
            tx.amount
        ));
    }

    section
}

/// Generate a one-line-per-customer listing.
pub fn generate_customers_text(customers: &[IdentityRecord]) -> String {
    if customers.is_empty() {
        return "No customers.\n".to_string();
    }

    customers
        .iter()
        .map(|c| {
            format!(
                "{:>4}  {:<24} {:<14} since {}\n",
                c.id,
                c.full_name,
                c.phone_number.as_deref().unwrap_or("-"),
                c.created_at.format("%Y-%m-%d")
            )
        })
        .collect()
}

/// Generate a pretty-printed JSON rendering of any serializable value.
pub fn generate_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string_pretty(value)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AddressInfo, CustomerId, FinancialInstrument, TransactionSummary};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn create_test_profile() -> CompositeProfile {
        CompositeProfile {
            id: CustomerId(7),
            full_name: "Diego Moreno".to_string(),
            phone_number: Some("555-321-7654".to_string()),
            created_at: NaiveDate::from_ymd_opt(2016, 10, 3).unwrap(),
            address: Some(AddressInfo {
                id: "a1".to_string(),
                street: "Station Street".to_string(),
                street_number: "221".to_string(),
                city: "Austin".to_string(),
                state: "Texas".to_string(),
                zip_code: "73301".to_string(),
                country: "United States".to_string(),
            }),
            loyalty_points: Some(1840),
            financial_instruments: vec![FinancialInstrument {
                id: "f1".to_string(),
                credit_card_number: "6011-0000-0000-0004".to_string(),
                iban: "FR1420041010050500013M02606".to_string(),
            }],
            purchase_transactions: vec![TransactionSummary {
                id: "t1".to_string(),
                payment_type: "DISCOVER".to_string(),
                amount: Decimal::new(12550, 2),
                created_at: NaiveDate::from_ymd_opt(2022, 7, 19).unwrap(),
            }],
        }
    }

    #[test]
    fn test_generate_profile_text() {
        let text = generate_profile_text(&create_test_profile());

        assert!(text.contains("Customer #7: Diego Moreno"));
        assert!(text.contains("Loyalty points: 1840"));
        assert!(text.contains("221 Station Street"));
        assert!(text.contains("Financial instruments (1)"));
        assert!(text.contains("125.50"));
    }

    #[test]
    fn test_absent_channels_render_placeholders() {
        let mut profile = create_test_profile();
        profile.address = None;
        profile.loyalty_points = None;
        profile.purchase_transactions.clear();

        let text = generate_profile_text(&profile);
        assert!(text.contains("(none on file)"));
        assert!(text.contains("Loyalty points: -"));
        assert!(text.contains("Purchase transactions (0)"));
    }

    #[test]
    fn test_generate_json_omits_absent_channels() {
        let mut profile = create_test_profile();
        let json = generate_json(&profile).unwrap();
        assert!(json.contains("\"loyalty_points\": 1840"));
        assert!(json.contains("\"amount\": \"125.50\""));

        profile.address = None;
        let json = generate_json(&profile).unwrap();
        assert!(!json.contains("\"address\""));
    }

    #[test]
    fn test_generate_customers_text() {
        assert_eq!(generate_customers_text(&[]), "No customers.\n");

        let customers = vec![IdentityRecord {
            id: CustomerId(1),
            full_name: "Priya Raman".to_string(),
            phone_number: None,
            created_at: NaiveDate::from_ymd_opt(2020, 2, 29).unwrap(),
        }];
        let text = generate_customers_text(&customers);
        assert!(text.contains("Priya Raman"));
        assert!(text.contains("since 2020-02-29"));
    }
}
