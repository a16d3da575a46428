//! Currency conversion, line totals and apportionment.
//!
//! Totals are always computed from a unit price times a quantity. Deriving one
//! currency's total from the other currency's already-rounded total drifts, so
//! no function here accepts a total as conversion input.

use rust_decimal::prelude::*;

use crate::error::{PricingError, PricingResult};
use crate::money::{ExchangeRate, LedgerAmount, SettlementAmount, round_cents};

/// Convert a settlement amount into whole ledger units, rounding half-up.
pub fn to_ledger_currency(amount: SettlementAmount, rate: ExchangeRate) -> PricingResult<LedgerAmount> {
    let product = amount
        .value()
        .checked_mul(rate.value())
        .ok_or_else(|| PricingError::invalid("conversion overflow"))?;
    let rounded = product.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    rounded
        .to_i64()
        .map(LedgerAmount::new)
        .ok_or_else(|| PricingError::invalid(format!("converted amount out of range: {rounded}")))
}

/// Convert whole ledger units into the settlement currency, rounded to cents.
pub fn to_settlement_currency(amount: LedgerAmount, rate: ExchangeRate) -> PricingResult<SettlementAmount> {
    let quotient = Decimal::from(amount.units())
        .checked_div(rate.value())
        .ok_or_else(|| PricingError::invalid("conversion overflow"))?;
    Ok(SettlementAmount::new(round_cents(quotient)))
}

/// `unit_price × quantity` in the ledger currency.
pub fn line_total_ledger(unit_price: LedgerAmount, quantity: i64) -> PricingResult<LedgerAmount> {
    check_quantity(quantity)?;
    unit_price.checked_mul_qty(quantity)
}

/// `unit_price × quantity` in the settlement currency.
pub fn line_total_settlement(unit_price: SettlementAmount, quantity: i64) -> PricingResult<SettlementAmount> {
    check_quantity(quantity)?;
    if unit_price.is_negative() {
        return Err(PricingError::invalid(format!("unit price is negative: {unit_price}")));
    }
    unit_price
        .value()
        .checked_mul(Decimal::from(quantity))
        .map(SettlementAmount::new)
        .ok_or_else(|| PricingError::invalid("line total overflow"))
}

/// Split `total` across `weights` proportionally using the largest remainder
/// method. The parts always sum to `total`; ties go to the earliest weight.
pub fn apportion(total: LedgerAmount, weights: &[u64]) -> PricingResult<Vec<LedgerAmount>> {
    if weights.is_empty() {
        return if total == LedgerAmount::ZERO {
            Ok(Vec::new())
        } else {
            Err(PricingError::invalid("cannot apportion a non-zero amount over no weights"))
        };
    }

    let weight_sum: u128 = weights.iter().map(|w| u128::from(*w)).sum();
    if weight_sum == 0 {
        return Err(PricingError::invalid("apportionment weights sum to zero"));
    }

    let sign: i128 = if total.units() < 0 { -1 } else { 1 };
    let magnitude = i128::from(total.units()).unsigned_abs();

    let mut parts: Vec<u128> = Vec::with_capacity(weights.len());
    let mut remainders: Vec<(usize, u128)> = Vec::with_capacity(weights.len());
    for (idx, w) in weights.iter().enumerate() {
        let scaled = magnitude * u128::from(*w);
        parts.push(scaled / weight_sum);
        remainders.push((idx, scaled % weight_sum));
    }

    let assigned: u128 = parts.iter().sum();
    let leftover = (magnitude - assigned) as usize;

    // Largest remainder first; stable sort keeps earlier indices ahead on ties.
    remainders.sort_by(|a, b| b.1.cmp(&a.1));
    for (idx, _) in remainders.into_iter().take(leftover) {
        parts[idx] += 1;
    }

    parts
        .into_iter()
        .map(|p| {
            i64::try_from(sign * p as i128)
                .map(LedgerAmount::new)
                .map_err(|_| PricingError::invalid("apportioned amount out of range"))
        })
        .collect()
}

fn check_quantity(quantity: i64) -> PricingResult<()> {
    if quantity < 0 {
        return Err(PricingError::invalid(format!("quantity is negative: {quantity}")));
    }
    Ok(())
}
