//! Inbound sale requests and finalization results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lotkeeper_core::{BuyerRef, LotId, SaleId, UserId};
use lotkeeper_inventory::{Allocation, AllocationWarning, ValidatedLine};
use lotkeeper_ledger::SaleEvent;
use lotkeeper_pricing::{ExchangeRate, ProfitBreakdown, SaleLine, SaleQuote, ShippingTerms};
use lotkeeper_sync::PushOutcome;

/// Rate snapshot taken when a sale starts. Preview and finalize both price
/// against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleContext {
    pub sale_id: SaleId,
    pub rate: ExchangeRate,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLine {
    pub line: SaleLine,
    pub allocations: Vec<Allocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    pub context: SaleContext,
    pub buyer: BuyerRef,
    pub lines: Vec<RequestLine>,
    pub shipping: ShippingTerms,
    pub channel: String,
    #[serde(default)]
    pub staff: Option<UserId>,
}

impl SaleRequest {
    pub fn sale_lines(&self) -> Vec<SaleLine> {
        self.lines.iter().map(|l| l.line.clone()).collect()
    }
}

/// Pure preview of a sale: nothing has been reserved or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalePreview {
    pub quote: SaleQuote,
    pub lines: Vec<ValidatedLine>,
    /// Profit at current lot costs.
    pub profit: ProfitBreakdown,
}

/// A sync push that did not complete. The sale itself stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncWarning {
    pub reference: String,
    pub outcome: PushOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedSale {
    pub sale_id: SaleId,
    pub quote: SaleQuote,
    /// One event per (line, lot) consumption.
    pub events: Vec<SaleEvent>,
    pub profit: ProfitBreakdown,
    pub warnings: Vec<AllocationWarning>,
    pub sync_warnings: Vec<SyncWarning>,
    /// Lots emptied by this sale.
    pub depleted: Vec<LotId>,
}

impl FinalizedSale {
    pub fn fully_synced(&self) -> bool {
        self.sync_warnings.is_empty()
    }
}
