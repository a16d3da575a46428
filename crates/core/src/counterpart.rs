//! Counterpart identity: the seller in a buyback, the buyer in a sale.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether the counterpart is a private individual or a business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterpartKind {
    Individual,
    Business,
}

/// Where a lot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotSource {
    /// Bought from a private customer (dealer-ledger rules apply in full).
    CustomerBuyback,
    /// Bought from a trade supplier.
    Supplier,
}

/// Identity fields the dealer ledger must retain for every purchase.
///
/// Age is intentionally not stored; it is derived from `birth_date` whenever a
/// record is validated or exported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Counterpart {
    pub kind: CounterpartKind,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    /// Reference to the identity document inspected at purchase time.
    #[serde(default)]
    pub id_document: Option<String>,
}

impl Counterpart {
    pub fn individual(name: impl Into<String>) -> Self {
        Self {
            kind: CounterpartKind::Individual,
            name: name.into(),
            address: None,
            occupation: None,
            birth_date: None,
            id_document: None,
        }
    }

    pub fn business(name: impl Into<String>) -> Self {
        Self {
            kind: CounterpartKind::Business,
            ..Self::individual(name)
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_occupation(mut self, occupation: impl Into<String>) -> Self {
        self.occupation = Some(occupation.into());
        self
    }

    pub fn with_birth_date(mut self, birth_date: NaiveDate) -> Self {
        self.birth_date = Some(birth_date);
        self
    }

    pub fn with_id_document(mut self, reference: impl Into<String>) -> Self {
        self.id_document = Some(reference.into());
        self
    }

    /// Completed calendar years between `birth_date` and `as_of`.
    pub fn age_on(&self, as_of: NaiveDate) -> Option<u32> {
        self.birth_date.and_then(|born| as_of.years_since(born))
    }
}

/// Reference to the buyer of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuyerRef {
    pub name: String,
    /// Marketplace or customer-system identifier, if any.
    #[serde(default)]
    pub reference: Option<String>,
    /// Destination country (ISO 3166 alpha-2) for cross-border sales.
    #[serde(default)]
    pub country: Option<String>,
}

impl BuyerRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: None,
            country: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_counts_completed_years() {
        let c = Counterpart::individual("Sato").with_birth_date(date(1990, 6, 15));
        assert_eq!(c.age_on(date(2024, 6, 14)), Some(33));
        assert_eq!(c.age_on(date(2024, 6, 15)), Some(34));
    }

    #[test]
    fn age_is_absent_without_birth_date() {
        assert_eq!(Counterpart::individual("Sato").age_on(date(2024, 1, 1)), None);
    }

    #[test]
    fn age_before_birth_is_absent() {
        let c = Counterpart::individual("Sato").with_birth_date(date(2030, 1, 1));
        assert_eq!(c.age_on(date(2024, 1, 1)), None);
    }
}
