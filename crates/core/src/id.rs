//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of an inventory lot (locally generated, stable).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LotId(Uuid);

/// Identifier of a finalized sale.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleId(Uuid);

/// Identifier of a staff user (actor identity).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(LotId, "LotId");
impl_uuid_newtype!(SaleId, "SaleId");
impl_uuid_newtype!(UserId, "UserId");

/// Key of a ledger record: a lot registered by this system, or an item id
/// carried over from historical flat sale records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum InventoryIdentity {
    Lot(LotId),
    LegacyItem(String),
}

impl InventoryIdentity {
    pub fn lot_id(&self) -> Option<LotId> {
        match self {
            InventoryIdentity::Lot(id) => Some(*id),
            InventoryIdentity::LegacyItem(_) => None,
        }
    }
}

impl From<LotId> for InventoryIdentity {
    fn from(value: LotId) -> Self {
        InventoryIdentity::Lot(value)
    }
}

impl core::fmt::Display for InventoryIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            InventoryIdentity::Lot(id) => write!(f, "lot:{id}"),
            InventoryIdentity::LegacyItem(id) => write!(f, "item:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lot_id_parses_from_display() {
        let id = LotId::new();
        let parsed: LotId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn invalid_uuid_reports_type_name() {
        let err = "not-a-uuid".parse::<SaleId>().unwrap_err();
        match err {
            DomainError::InvalidId(msg) if msg.starts_with("SaleId") => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn identity_display_distinguishes_kinds() {
        let lot = LotId::from_uuid(Uuid::nil());
        assert_eq!(
            InventoryIdentity::Lot(lot).to_string(),
            "lot:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            InventoryIdentity::LegacyItem("A-17".into()).to_string(),
            "item:A-17"
        );
    }

    #[test]
    fn identity_serializes_as_tagged_value() {
        let json = serde_json::to_value(InventoryIdentity::LegacyItem("A-17".into())).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "legacy_item", "id": "A-17" }));
    }
}
