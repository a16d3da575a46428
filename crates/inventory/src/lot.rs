use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use lotkeeper_core::LotSource;
use lotkeeper_core::{Counterpart, DomainError, DomainResult, LotId, ProductDescriptor, Rank, UserId};
use lotkeeper_pricing::LedgerAmount;

use crate::error::AllocationWarning;

/// Input for registering a new lot (buyback or supplier intake).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotIntake {
    pub descriptor: ProductDescriptor,
    pub rank: Rank,
    pub acquisition_unit_price: LedgerAmount,
    pub quantity: u32,
    #[serde(default)]
    pub management_numbers: Vec<String>,
    pub source: LotSource,
    pub counterpart: Counterpart,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub registered_by: Option<UserId>,
}

/// A physical batch of identical-condition units.
///
/// Invariant: `allocated <= total`, so `available()` never underflows.
/// Management numbers are kept in intake order and drawn from the front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLot {
    id: LotId,
    external_id: Option<String>,
    descriptor: ProductDescriptor,
    rank: Rank,
    acquisition_unit_price: LedgerAmount,
    total_quantity: u32,
    allocated_quantity: u32,
    management_numbers: Vec<String>,
    source: LotSource,
    counterpart: Counterpart,
    registered_at: DateTime<Utc>,
    registered_by: Option<UserId>,
}

/// Units taken from one lot by a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Drawn {
    pub management_numbers: Vec<String>,
    pub warning: Option<AllocationWarning>,
}

impl InventoryLot {
    /// Validate an intake and build the lot.
    pub fn register(id: LotId, intake: LotIntake, registered_at: DateTime<Utc>) -> DomainResult<Self> {
        if intake.quantity == 0 {
            return Err(DomainError::validation("lot quantity must be positive"));
        }
        if intake.acquisition_unit_price < LedgerAmount::ZERO {
            return Err(DomainError::validation("acquisition price cannot be negative"));
        }
        if intake.counterpart.name.trim().is_empty() {
            return Err(DomainError::validation("counterpart name cannot be empty"));
        }
        if intake.management_numbers.len() > intake.quantity as usize {
            return Err(DomainError::TooManyManagementNumbers {
                numbers: intake.management_numbers.len(),
                quantity: intake.quantity,
            });
        }
        let mut seen = HashSet::new();
        for number in &intake.management_numbers {
            if number.trim().is_empty() {
                return Err(DomainError::validation("management number cannot be blank"));
            }
            if !seen.insert(number.as_str()) {
                return Err(DomainError::DuplicateManagementNumber(number.clone()));
            }
        }

        Ok(Self {
            id,
            external_id: intake.external_id,
            descriptor: intake.descriptor,
            rank: intake.rank,
            acquisition_unit_price: intake.acquisition_unit_price,
            total_quantity: intake.quantity,
            allocated_quantity: 0,
            management_numbers: intake.management_numbers,
            source: intake.source,
            counterpart: intake.counterpart,
            registered_at,
            registered_by: intake.registered_by,
        })
    }

    pub fn id(&self) -> LotId {
        self.id
    }

    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    pub fn descriptor(&self) -> &ProductDescriptor {
        &self.descriptor
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn acquisition_unit_price(&self) -> LedgerAmount {
        self.acquisition_unit_price
    }

    pub fn total_quantity(&self) -> u32 {
        self.total_quantity
    }

    pub fn allocated_quantity(&self) -> u32 {
        self.allocated_quantity
    }

    pub fn available(&self) -> u32 {
        self.total_quantity - self.allocated_quantity
    }

    pub fn is_depleted(&self) -> bool {
        self.available() == 0
    }

    /// Unconsumed management numbers, in draw order.
    pub fn management_numbers(&self) -> &[String] {
        &self.management_numbers
    }

    pub fn source(&self) -> LotSource {
        self.source
    }

    pub fn counterpart(&self) -> &Counterpart {
        &self.counterpart
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    pub fn registered_by(&self) -> Option<UserId> {
        self.registered_by
    }

    pub fn set_external_id(&mut self, external_id: impl Into<String>) {
        self.external_id = Some(external_id.into());
    }

    /// Take `quantity` units. Callers must have checked availability.
    pub(crate) fn draw(&mut self, quantity: u32) -> Drawn {
        debug_assert!(quantity <= self.available());
        self.allocated_quantity += quantity;

        let take = (quantity as usize).min(self.management_numbers.len());
        let management_numbers: Vec<String> = self.management_numbers.drain(..take).collect();
        let warning = (take < quantity as usize).then(|| AllocationWarning::ManagementNumbersExhausted {
            lot_id: self.id,
            requested: quantity,
            available: take as u32,
        });

        Drawn {
            management_numbers,
            warning,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn intake(rank: Rank, price: i64, quantity: u32) -> LotIntake {
        LotIntake {
            descriptor: ProductDescriptor::new("Switch OLED").unwrap().with_color("White"),
            rank,
            acquisition_unit_price: LedgerAmount::new(price),
            quantity,
            management_numbers: (1..=quantity).map(|n| format!("M-{n:03}")).collect(),
            source: LotSource::CustomerBuyback,
            counterpart: Counterpart::individual("Taro Yamada"),
            external_id: None,
            registered_by: None,
        }
    }

    pub fn lot(rank: Rank, price: i64, quantity: u32) -> InventoryLot {
        InventoryLot::register(LotId::new(), intake(rank, price, quantity), Utc::now()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn register_rejects_zero_quantity() {
        let err = InventoryLot::register(LotId::new(), intake(Rank::A, 100, 0), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::validation("lot quantity must be positive"));
    }

    #[test]
    fn register_rejects_duplicate_management_numbers() {
        let mut i = intake(Rank::A, 100, 2);
        i.management_numbers = vec!["X".into(), "X".into()];
        match InventoryLot::register(LotId::new(), i, Utc::now()) {
            Err(DomainError::DuplicateManagementNumber(n)) => assert_eq!(n, "X"),
            other => panic!("expected duplicate number, got {other:?}"),
        }
    }

    #[test]
    fn register_rejects_more_numbers_than_units() {
        let mut i = intake(Rank::A, 100, 1);
        i.management_numbers = vec!["X".into(), "Y".into()];
        match InventoryLot::register(LotId::new(), i, Utc::now()) {
            Err(DomainError::TooManyManagementNumbers { numbers: 2, quantity: 1 }) => {}
            other => panic!("expected too many numbers, got {other:?}"),
        }
    }

    #[test]
    fn draw_takes_numbers_from_the_front() {
        let mut l = lot(Rank::A, 100, 3);
        let drawn = l.draw(2);
        assert_eq!(drawn.management_numbers, vec!["M-001", "M-002"]);
        assert!(drawn.warning.is_none());
        assert_eq!(l.available(), 1);
        assert_eq!(l.management_numbers(), ["M-003".to_string()]);
    }

    #[test]
    fn draw_flags_missing_numbers() {
        let mut i = intake(Rank::B, 100, 3);
        i.management_numbers.truncate(1);
        let mut l = InventoryLot::register(LotId::new(), i, Utc::now()).unwrap();
        let drawn = l.draw(3);
        assert_eq!(drawn.management_numbers.len(), 1);
        assert_eq!(
            drawn.warning,
            Some(AllocationWarning::ManagementNumbersExhausted {
                lot_id: l.id(),
                requested: 3,
                available: 1,
            })
        );
        assert!(l.is_depleted());
    }
}
