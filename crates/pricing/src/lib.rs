//! Currency & pricing calculator.
//!
//! Pure functions only: converting between the settlement currency a sale is
//! negotiated in and the ledger currency it is booked in, line totals, shipping
//! apportionment and profit. Nothing here reads a clock, a store or a global
//! exchange rate; the caller passes the rate snapshot explicitly.

mod convert;
mod error;
mod money;
mod quote;

pub use convert::{apportion, line_total_ledger, line_total_settlement, to_ledger_currency, to_settlement_currency};
pub use error::{PricingError, PricingResult};
pub use money::{ExchangeRate, LedgerAmount, SettlementAmount};
pub use quote::{LineQuote, ProfitBreakdown, SaleLine, SaleQuote, ShippingPayer, ShippingTerms, quote_sale};
