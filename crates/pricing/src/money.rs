//! Typed amounts.
//!
//! Ledger amounts are whole ledger-currency units (JPY has no minor unit in
//! bookkeeping). Settlement amounts are decimals held at two places.

use core::ops::{Add, Mul, Neg, Sub};
use core::str::FromStr;

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PricingError, PricingResult};

/// Amount in the ledger currency, whole units.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerAmount(i64);

impl LedgerAmount {
    pub const ZERO: LedgerAmount = LedgerAmount(0);

    pub const fn new(units: i64) -> Self {
        Self(units)
    }

    pub const fn units(self) -> i64 {
        self.0
    }

    pub fn checked_mul_qty(self, quantity: i64) -> PricingResult<Self> {
        self.0
            .checked_mul(quantity)
            .map(Self)
            .ok_or_else(|| PricingError::invalid("ledger amount overflow"))
    }

    pub fn checked_add(self, rhs: Self) -> PricingResult<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| PricingError::invalid("ledger amount overflow"))
    }

    pub fn checked_sub(self, rhs: Self) -> PricingResult<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or_else(|| PricingError::invalid("ledger amount overflow"))
    }

    /// Sum that fails instead of clamping. Use it for totals that are
    /// booked or shown as a sale's price or profit.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Self>) -> PricingResult<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

// The operators saturate; ledger folds use them over already-validated events.
impl Add for LedgerAmount {
    type Output = LedgerAmount;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for LedgerAmount {
    type Output = LedgerAmount;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for LedgerAmount {
    type Output = LedgerAmount;

    fn neg(self) -> Self::Output {
        Self(self.0.saturating_neg())
    }
}

impl core::iter::Sum for LedgerAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(LedgerAmount::ZERO, Add::add)
    }
}

impl core::fmt::Display for LedgerAmount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Amount in the settlement currency, rounded to two decimal places.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettlementAmount(Decimal);

impl SettlementAmount {
    pub const ZERO: SettlementAmount = SettlementAmount(Decimal::ZERO);

    /// Construct from a decimal, rounding half-up to two places.
    pub fn new(value: Decimal) -> Self {
        Self(round_cents(value))
    }

    /// Construct from a float (form input). Non-finite values are rejected.
    pub fn from_f64(value: f64) -> PricingResult<Self> {
        if !value.is_finite() {
            return Err(PricingError::invalid(format!("price is not finite: {value}")));
        }
        Decimal::from_f64(value)
            .map(Self::new)
            .ok_or_else(|| PricingError::invalid(format!("price out of range: {value}")))
    }

    /// Whole units plus cents, e.g. `from_cents(2500)` is 25.00.
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl FromStr for SettlementAmount {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Self::new)
            .map_err(|e| PricingError::invalid(format!("invalid amount '{s}': {e}")))
    }
}

impl Add for SettlementAmount {
    type Output = SettlementAmount;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for SettlementAmount {
    type Output = SettlementAmount;

    fn mul(self, rhs: u32) -> Self::Output {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl core::iter::Sum for SettlementAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(SettlementAmount::ZERO, Add::add)
    }
}

impl core::fmt::Display for SettlementAmount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Settlement → ledger conversion factor (ledger units per settlement unit).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct ExchangeRate(Decimal);

impl ExchangeRate {
    pub fn new(rate: Decimal) -> PricingResult<Self> {
        if rate <= Decimal::ZERO {
            return Err(PricingError::invalid(format!(
                "exchange rate must be positive, got {rate}"
            )));
        }
        Ok(Self(rate))
    }

    pub fn from_f64(rate: f64) -> PricingResult<Self> {
        if !rate.is_finite() {
            return Err(PricingError::invalid(format!("exchange rate is not finite: {rate}")));
        }
        let rate = Decimal::from_f64(rate)
            .ok_or_else(|| PricingError::invalid(format!("exchange rate out of range: {rate}")))?;
        Self::new(rate)
    }

    pub fn value(self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for ExchangeRate {
    type Error = PricingError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExchangeRate> for Decimal {
    fn from(value: ExchangeRate) -> Self {
        value.0
    }
}

impl core::fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
