//! Synthetic data for the in-memory backends.
//!
//! Seeds customers `1..=n` with an identity record, an address, one to four
//! financial instruments, one to ten purchases, and loyalty points derived
//! from purchase totals and tenure.

use super::MemoryBackends;
use crate::models::{
    AddressInfo, CustomerId, FinancialInstrument, IdentityRecord, LoyaltyPoints,
    PurchaseTransaction,
};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Builder;

const FIRST_NAMES: &[&str] = &[
    "Olena", "Marcus", "Aiko", "Diego", "Priya", "Tomasz", "Grace", "Idris", "Leila", "Viktor",
];

const LAST_NAMES: &[&str] = &[
    "Kovalenko", "Whitfield", "Tanaka", "Moreno", "Raman", "Nowak", "Okafor", "Lindqvist",
    "Haddad", "Petrov",
];

const STREETS: &[&str] = &[
    "Maple Avenue", "Harbor Road", "Chestnut Lane", "Station Street", "Orchard Way",
    "Riverside Drive",
];

const CITIES: &[(&str, &str)] = &[
    ("Springfield", "Illinois"),
    ("Portland", "Oregon"),
    ("Austin", "Texas"),
    ("Madison", "Wisconsin"),
    ("Savannah", "Georgia"),
];

const COUNTRIES: &[&str] = &["United States", "Canada", "Poland", "Ukraine", "Germany"];

const CARD_TYPES: &[&str] = &[
    "VISA",
    "MASTERCARD",
    "DISCOVER",
    "AMERICAN_EXPRESS",
    "DINERS_CLUB",
    "JCB",
    "SWITCH",
    "SOLO",
    "DANKORT",
    "LASER",
];

/// Tenure-weighted loyalty points: the purchase total times whole years as
/// a customer (at least one), truncated.
pub fn derive_points(
    created_at: NaiveDate,
    today: NaiveDate,
    purchases: &[PurchaseTransaction],
) -> LoyaltyPoints {
    let total: Decimal = purchases.iter().map(|p| p.amount).sum();
    let years = today.years_since(created_at).unwrap_or(0).max(1);
    (total * Decimal::from(years))
        .trunc()
        .to_i64()
        .unwrap_or(LoyaltyPoints::MAX)
}

/// Generates and installs synthetic customer data.
pub struct Seeder {
    rng: StdRng,
    today: NaiveDate,
}

impl Seeder {
    /// Create a seeder; a fixed `seed` makes the generated data reproducible.
    pub fn new(seed: Option<u64>, today: NaiveDate) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, today }
    }

    /// Populate every stub for customers `1..=customers`.
    pub fn seed(&mut self, stubs: &MemoryBackends, customers: u32) {
        info!("Seeding {} customers", customers);

        for raw_id in 1..=customers {
            let id = CustomerId(raw_id);
            let identity = self.identity(id);
            let purchases = self.purchases(id);
            let points = derive_points(identity.created_at, self.today, &purchases);

            stubs.address.insert(id, self.address());
            stubs.financial.insert(id, self.instruments());
            stubs.loyalty.insert(id, points);
            stubs.transactions.insert(id, purchases);
            stubs.identity.insert(id, identity);
        }
    }

    /// A v4 uuid drawn from the seeded generator.
    fn fresh_id(&mut self) -> String {
        Builder::from_random_bytes(self.rng.gen()).into_uuid().to_string()
    }

    fn pick<'a>(&mut self, values: &'a [&'a str]) -> &'a str {
        values.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn digits(&mut self, count: usize) -> String {
        (0..count)
            .map(|_| char::from(b'0' + self.rng.gen_range(0..10u8)))
            .collect()
    }

    fn past_date(&mut self) -> NaiveDate {
        self.today - Duration::days(self.rng.gen_range(0..365 * 10))
    }

    fn identity(&mut self, id: CustomerId) -> IdentityRecord {
        let full_name = format!("{} {}", self.pick(FIRST_NAMES), self.pick(LAST_NAMES));
        let phone_number = format!("555-{}-{}", self.digits(3), self.digits(4));
        IdentityRecord {
            id,
            full_name,
            phone_number: Some(phone_number),
            created_at: self.past_date(),
        }
    }

    fn address(&mut self) -> AddressInfo {
        let (city, state) = CITIES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(("Springfield", "Illinois"));
        AddressInfo {
            id: self.fresh_id(),
            street: self.pick(STREETS).to_string(),
            street_number: self.rng.gen_range(1..2000).to_string(),
            city: city.to_string(),
            state: state.to_string(),
            zip_code: self.digits(5),
            country: self.pick(COUNTRIES).to_string(),
        }
    }

    fn instruments(&mut self) -> Vec<FinancialInstrument> {
        let count = self.rng.gen_range(1..=4);
        (0..count)
            .map(|_| FinancialInstrument {
                id: self.fresh_id(),
                credit_card_number: format!(
                    "{}-{}-{}-{}",
                    self.digits(4),
                    self.digits(4),
                    self.digits(4),
                    self.digits(4)
                ),
                iban: format!("DE{}", self.digits(20)),
            })
            .collect()
    }

    fn purchases(&mut self, customer_id: CustomerId) -> Vec<PurchaseTransaction> {
        let count = self.rng.gen_range(1..=10);
        (0..count)
            .map(|_| PurchaseTransaction {
                id: self.fresh_id(),
                customer_id,
                payment_type: self.pick(CARD_TYPES).to_string(),
                amount: Decimal::new(self.rng.gen_range(100..100_000), 2),
                created_at: self.past_date(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LatencyConfig;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn purchase(amount: Decimal) -> PurchaseTransaction {
        PurchaseTransaction {
            id: "p".to_string(),
            customer_id: CustomerId(1),
            payment_type: "VISA".to_string(),
            amount,
            created_at: today(),
        }
    }

    #[test]
    fn test_points_use_at_least_one_year() {
        let purchases = vec![purchase(Decimal::new(1050, 2)), purchase(Decimal::new(249, 2))];
        // 12.99 over less than a year of tenure
        assert_eq!(derive_points(today(), today(), &purchases), 12);
    }

    #[test]
    fn test_points_scale_with_tenure() {
        let purchases = vec![purchase(Decimal::new(1000, 2))];
        let created = NaiveDate::from_ymd_opt(2021, 5, 1).unwrap();
        assert_eq!(derive_points(created, today(), &purchases), 30);
        assert_eq!(derive_points(created, today(), &[]), 0);
    }

    #[test]
    fn test_seed_populates_every_backend() {
        let stubs = MemoryBackends::new(&LatencyConfig::uniform(0));
        Seeder::new(Some(42), today()).seed(&stubs, 9);

        for raw_id in 1..=9 {
            let id = CustomerId(raw_id);
            assert!(stubs.identity.peek(id).is_some());
            assert!(stubs.address.peek(id).is_some());
            assert!(stubs.loyalty.peek(id).is_some());

            let instruments = stubs.financial.peek(id).unwrap();
            assert!((1..=4).contains(&instruments.len()));

            let purchases = stubs.transactions.peek(id).unwrap();
            assert!((1..=10).contains(&purchases.len()));
            assert!(purchases.iter().all(|p| p.customer_id == id));
            assert!(purchases.iter().all(|p| p.amount >= Decimal::ZERO));
        }
        assert!(stubs.identity.peek(CustomerId(10)).is_none());
    }

    #[test]
    fn test_same_seed_reproduces_every_channel() {
        let first = MemoryBackends::new(&LatencyConfig::uniform(0));
        let second = MemoryBackends::new(&LatencyConfig::uniform(0));
        Seeder::new(Some(42), today()).seed(&first, 4);
        Seeder::new(Some(42), today()).seed(&second, 4);

        for raw_id in 1..=4 {
            let id = CustomerId(raw_id);
            assert_eq!(first.identity.peek(id), second.identity.peek(id));
            assert_eq!(first.address.peek(id), second.address.peek(id));
            assert_eq!(first.financial.peek(id), second.financial.peek(id));
            assert_eq!(first.transactions.peek(id), second.transactions.peek(id));
            assert_eq!(first.loyalty.peek(id), second.loyalty.peek(id));
        }

        let address = first.address.peek(CustomerId(1)).unwrap();
        let parsed = uuid::Uuid::parse_str(&address.id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_different_seeds_produce_different_ids() {
        let first = MemoryBackends::new(&LatencyConfig::uniform(0));
        let second = MemoryBackends::new(&LatencyConfig::uniform(0));
        Seeder::new(Some(1), today()).seed(&first, 1);
        Seeder::new(Some(2), today()).seed(&second, 1);

        assert_ne!(
            first.address.peek(CustomerId(1)).unwrap().id,
            second.address.peek(CustomerId(1)).unwrap().id
        );
    }

    #[test]
    fn test_seeded_loyalty_matches_derivation() {
        let stubs = MemoryBackends::new(&LatencyConfig::uniform(0));
        Seeder::new(Some(7), today()).seed(&stubs, 3);

        for raw_id in 1..=3 {
            let id = CustomerId(raw_id);
            let identity = stubs.identity.peek(id).unwrap();
            let purchases = stubs.transactions.peek(id).unwrap();
            assert_eq!(
                stubs.loyalty.peek(id),
                Some(derive_points(identity.created_at, today(), &purchases))
            );
        }
    }
}
