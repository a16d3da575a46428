//! Sale quotes: the pure pricing preview shown before a sale is finalized.

use serde::{Deserialize, Serialize};

use lotkeeper_core::ProductDescriptor;

use crate::convert::{apportion, line_total_ledger, line_total_settlement, to_ledger_currency};
use crate::error::{PricingError, PricingResult};
use crate::money::{ExchangeRate, LedgerAmount, SettlementAmount};

/// One requested product/quantity within a sale, independent of the lots that
/// will fulfil it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub descriptor: ProductDescriptor,
    pub quantity: u32,
    /// Negotiated unit price in the settlement currency.
    pub unit_price: SettlementAmount,
}

impl SaleLine {
    pub fn new(descriptor: ProductDescriptor, quantity: u32, unit_price: SettlementAmount) -> Self {
        Self {
            descriptor,
            quantity,
            unit_price,
        }
    }
}

/// Who bears the shipping fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingPayer {
    Seller,
    Buyer,
}

/// Shipping terms for a sale. The fee is booked in the ledger currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingTerms {
    pub method: String,
    pub fee: LedgerAmount,
    pub payer: ShippingPayer,
}

impl ShippingTerms {
    pub fn none() -> Self {
        Self {
            method: "none".to_string(),
            fee: LedgerAmount::ZERO,
            payer: ShippingPayer::Buyer,
        }
    }

    pub fn seller_paid(method: impl Into<String>, fee: LedgerAmount) -> Self {
        Self {
            method: method.into(),
            fee,
            payer: ShippingPayer::Seller,
        }
    }

    /// The part of the fee that reduces the seller's profit.
    pub fn seller_cost(&self) -> LedgerAmount {
        match self.payer {
            ShippingPayer::Seller => self.fee,
            ShippingPayer::Buyer => LedgerAmount::ZERO,
        }
    }
}

/// Priced sale line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineQuote {
    pub quantity: u32,
    pub unit_settlement: SettlementAmount,
    /// Derived from the settlement unit price, never from a total.
    pub unit_ledger: LedgerAmount,
    pub total_settlement: SettlementAmount,
    pub total_ledger: LedgerAmount,
    /// This line's share of the seller-borne shipping fee.
    pub shipping_ledger: LedgerAmount,
}

/// Priced sale, computed from one exchange-rate snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleQuote {
    pub rate: ExchangeRate,
    pub lines: Vec<LineQuote>,
    pub total_settlement: SettlementAmount,
    /// Revenue in the ledger currency.
    pub total_ledger: LedgerAmount,
    pub shipping: ShippingTerms,
}

/// Revenue, cost and profit of a finalized sale in the ledger currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitBreakdown {
    pub revenue: LedgerAmount,
    pub cost: LedgerAmount,
    pub shipping: LedgerAmount,
    pub profit: LedgerAmount,
}

impl ProfitBreakdown {
    pub fn compute(revenue: LedgerAmount, cost: LedgerAmount, shipping: LedgerAmount) -> PricingResult<Self> {
        Ok(Self {
            revenue,
            cost,
            shipping,
            profit: revenue.checked_sub(cost)?.checked_sub(shipping)?,
        })
    }
}

/// Price every line of a sale against a single exchange-rate snapshot.
///
/// The seller-borne shipping fee is apportioned over lines by quantity so the
/// per-line shares sum exactly to the fee.
pub fn quote_sale(lines: &[SaleLine], rate: ExchangeRate, shipping: &ShippingTerms) -> PricingResult<SaleQuote> {
    if lines.is_empty() {
        return Err(PricingError::invalid("a sale needs at least one line"));
    }
    if shipping.fee < LedgerAmount::ZERO {
        return Err(PricingError::invalid(format!("shipping fee is negative: {}", shipping.fee)));
    }

    let mut priced = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        if line.quantity == 0 {
            return Err(PricingError::invalid(format!("line {} has zero quantity", idx + 1)));
        }
        if line.unit_price.is_negative() {
            return Err(PricingError::invalid(format!(
                "line {} has a negative unit price ({})",
                idx + 1,
                line.unit_price
            )));
        }
        let quantity = i64::from(line.quantity);
        let unit_ledger = to_ledger_currency(line.unit_price, rate)?;
        priced.push(LineQuote {
            quantity: line.quantity,
            unit_settlement: line.unit_price,
            unit_ledger,
            total_settlement: line_total_settlement(line.unit_price, quantity)?,
            total_ledger: line_total_ledger(unit_ledger, quantity)?,
            shipping_ledger: LedgerAmount::ZERO,
        });
    }

    let weights: Vec<u64> = priced.iter().map(|l| u64::from(l.quantity)).collect();
    let shares = apportion(shipping.seller_cost(), &weights)?;
    for (line, share) in priced.iter_mut().zip(shares) {
        line.shipping_ledger = share;
    }

    Ok(SaleQuote {
        rate,
        total_settlement: priced.iter().map(|l| l.total_settlement).sum(),
        total_ledger: LedgerAmount::checked_sum(priced.iter().map(|l| l.total_ledger))?,
        lines: priced,
        shipping: shipping.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn rate(r: i64) -> ExchangeRate {
        ExchangeRate::new(Decimal::from(r)).unwrap()
    }

    fn line(qty: u32, price: &str) -> SaleLine {
        SaleLine::new(
            ProductDescriptor::new("PS5").unwrap(),
            qty,
            price.parse().unwrap(),
        )
    }

    #[test]
    fn quote_prices_each_line_from_unit_price() {
        let quote = quote_sale(&[line(5, "25.00")], rate(150), &ShippingTerms::none()).unwrap();
        assert_eq!(quote.lines[0].unit_ledger, LedgerAmount::new(3750));
        assert_eq!(quote.total_ledger, LedgerAmount::new(18_750));
        assert_eq!(quote.total_settlement, "125.00".parse().unwrap());
    }

    #[test]
    fn shipping_is_apportioned_by_quantity() {
        let shipping = ShippingTerms::seller_paid("EMS", LedgerAmount::new(1000));
        let quote = quote_sale(&[line(1, "10.00"), line(3, "10.00")], rate(150), &shipping).unwrap();
        assert_eq!(quote.lines[0].shipping_ledger, LedgerAmount::new(250));
        assert_eq!(quote.lines[1].shipping_ledger, LedgerAmount::new(750));
    }

    #[test]
    fn zero_quantity_line_is_rejected() {
        match quote_sale(&[line(0, "10.00")], rate(150), &ShippingTerms::none()) {
            Err(PricingError::InvalidPricingInput { reason }) => assert!(reason.contains("zero quantity")),
            other => panic!("expected InvalidPricingInput, got {other:?}"),
        }
    }

    #[test]
    fn empty_sale_is_rejected() {
        assert!(quote_sale(&[], rate(150), &ShippingTerms::none()).is_err());
    }

    #[test]
    fn buyer_paid_shipping_does_not_reduce_profit() {
        let terms = ShippingTerms {
            method: "courier".into(),
            fee: LedgerAmount::new(800),
            payer: ShippingPayer::Buyer,
        };
        assert_eq!(terms.seller_cost(), LedgerAmount::ZERO);
        let p = ProfitBreakdown::compute(LedgerAmount::new(18_750), LedgerAmount::new(15_000), terms.seller_cost())
            .unwrap();
        assert_eq!(p.profit, LedgerAmount::new(3_750));
    }

    #[test]
    fn profit_overflow_is_an_error_not_a_clamp() {
        match ProfitBreakdown::compute(LedgerAmount::new(i64::MIN + 10), LedgerAmount::new(100), LedgerAmount::ZERO) {
            Err(PricingError::InvalidPricingInput { reason }) => assert!(reason.contains("overflow")),
            other => panic!("expected InvalidPricingInput, got {other:?}"),
        }
    }
}
