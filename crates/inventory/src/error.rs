use thiserror::Error;

use lotkeeper_core::LotId;

/// Lot store failure (storage-level, no business meaning).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LotStoreError {
    #[error("lot {0} already exists")]
    Duplicate(LotId),

    #[error("lot store unavailable: {0}")]
    Unavailable(String),
}

/// Allocation failure. All variants are raised before any lot is mutated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// Sum of pending allocations differs from the requested quantity.
    #[error("allocation mismatch: requested {requested}, allocated {allocated}")]
    AllocationMismatch { requested: u32, allocated: u32 },

    /// A lot no longer has enough available units.
    #[error("insufficient stock in lot {lot_id}: requested {requested}, available {available}")]
    InsufficientStock {
        lot_id: LotId,
        requested: u32,
        available: u32,
    },

    /// The lot holds a different product than the sale line asks for.
    #[error("lot {lot_id} does not match the requested product")]
    DescriptorMismatch { lot_id: LotId },

    #[error("allocation quantity must be positive (lot {lot_id})")]
    ZeroQuantity { lot_id: LotId },

    #[error(transparent)]
    Store(#[from] LotStoreError),
}

/// Non-fatal allocation condition: the sale proceeds but is flagged.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocationWarning {
    /// The lot had fewer unconsumed management numbers than units sold.
    ManagementNumbersExhausted {
        lot_id: LotId,
        requested: u32,
        available: u32,
    },
}

impl core::fmt::Display for AllocationWarning {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AllocationWarning::ManagementNumbersExhausted {
                lot_id,
                requested,
                available,
            } => write!(
                f,
                "lot {lot_id} has {available} management numbers left for {requested} units"
            ),
        }
    }
}
