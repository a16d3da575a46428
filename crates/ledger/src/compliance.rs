//! Dealer-ledger compliance checks.
//!
//! Non-compliant records are flagged, never dropped: listings and exports
//! carry the missing fields alongside the row.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use lotkeeper_core::{InventoryIdentity, LotSource};

use crate::record::LedgerRecord;

/// A mandated ledger field that is absent or blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingField {
    TransactionDate,
    ItemDescription,
    DistinguishingFeatures,
    Quantity,
    UnitPrice,
    CounterpartName,
    Address,
    Occupation,
    Age,
}

impl MissingField {
    pub fn as_str(self) -> &'static str {
        match self {
            MissingField::TransactionDate => "transaction_date",
            MissingField::ItemDescription => "item_description",
            MissingField::DistinguishingFeatures => "distinguishing_features",
            MissingField::Quantity => "quantity",
            MissingField::UnitPrice => "unit_price",
            MissingField::CounterpartName => "counterpart_name",
            MissingField::Address => "address",
            MissingField::Occupation => "occupation",
            MissingField::Age => "age",
        }
    }
}

impl core::fmt::Display for MissingField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisory finding for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceViolation {
    pub identity: InventoryIdentity,
    pub missing: Vec<MissingField>,
}

fn blank(s: Option<&str>) -> bool {
    s.is_none_or(|v| v.trim().is_empty())
}

/// Mandated fields missing from `record`, in declaration order.
///
/// Age is derived from the counterpart's birth date as of `as_of`. Supplier
/// purchases are not held to the occupation and age requirements.
pub fn validate(record: &LedgerRecord, as_of: NaiveDate) -> Vec<MissingField> {
    let mut missing = Vec::new();

    if record.transaction_at().is_none() {
        missing.push(MissingField::TransactionDate);
    }

    match &record.descriptor {
        Some(d) if !d.console.trim().is_empty() => {}
        _ => missing.push(MissingField::ItemDescription),
    }

    let has_color = record.descriptor.as_ref().is_some_and(|d| !blank(d.color.as_deref()));
    if !has_color && record.rank.is_none() {
        missing.push(MissingField::DistinguishingFeatures);
    }

    if record.purchased_quantity <= 0 && record.sold_quantity <= 0 {
        missing.push(MissingField::Quantity);
    }

    if record.unit_price.is_none() {
        missing.push(MissingField::UnitPrice);
    }

    let counterpart = record.counterpart.as_ref();
    if blank(counterpart.map(|c| c.name.as_str())) {
        missing.push(MissingField::CounterpartName);
    }
    if blank(counterpart.and_then(|c| c.address.as_deref())) {
        missing.push(MissingField::Address);
    }

    if record.source != Some(LotSource::Supplier) {
        if blank(counterpart.and_then(|c| c.occupation.as_deref())) {
            missing.push(MissingField::Occupation);
        }
        if counterpart.and_then(|c| c.age_on(as_of)).is_none() {
            missing.push(MissingField::Age);
        }
    }

    missing
}

/// Advisory violations across `records`, skipping compliant ones.
pub fn audit<'a, I>(records: I, as_of: NaiveDate) -> Vec<ComplianceViolation>
where
    I: IntoIterator<Item = &'a LedgerRecord>,
{
    records
        .into_iter()
        .filter_map(|r| {
            let missing = validate(r, as_of);
            (!missing.is_empty()).then(|| ComplianceViolation {
                identity: r.identity.clone(),
                missing,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LedgerEvent;
    use crate::event::fixtures::purchase;
    use lotkeeper_core::LotId;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    fn test_record(edit: impl FnOnce(&mut crate::event::PurchaseEvent)) -> LedgerRecord {
        let lot = LotId::new();
        let mut p = purchase(lot, 1, 2, 1000);
        edit(&mut p);
        let events: Vec<LedgerEvent> = vec![p.into()];
        LedgerRecord::rebuild(&lot.into(), &events).unwrap()
    }

    #[test]
    fn complete_record_passes() {
        assert!(validate(&test_record(|_| {}), as_of()).is_empty());
    }

    #[test]
    fn missing_birth_date_flags_age() {
        let record = test_record(|p| p.counterpart.birth_date = None);
        assert_eq!(validate(&record, as_of()), vec![MissingField::Age]);
    }

    #[test]
    fn birth_date_after_as_of_flags_age() {
        let record = test_record(|p| {
            p.counterpart.birth_date = NaiveDate::from_ymd_opt(2030, 1, 1);
        });
        assert_eq!(validate(&record, as_of()), vec![MissingField::Age]);
    }

    #[test]
    fn blank_fields_count_as_missing() {
        let record = test_record(|p| {
            p.counterpart.address = Some("   ".into());
            p.counterpart.occupation = None;
        });
        assert_eq!(
            validate(&record, as_of()),
            vec![MissingField::Address, MissingField::Occupation]
        );
    }

    #[test]
    fn supplier_lot_skips_occupation_and_age() {
        let record = test_record(|p| {
            p.source = LotSource::Supplier;
            p.counterpart.occupation = None;
            p.counterpart.birth_date = None;
        });
        assert!(validate(&record, as_of()).is_empty());
    }

    #[test]
    fn features_need_color_or_rank() {
        let record = test_record(|p| {
            p.descriptor.color = None;
            p.rank = None;
        });
        assert_eq!(validate(&record, as_of()), vec![MissingField::DistinguishingFeatures]);
    }

    #[test]
    fn audit_reports_only_violations() {
        let ok = test_record(|_| {});
        let bad = test_record(|p| p.counterpart.birth_date = None);
        let found = audit([&ok, &bad], as_of());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].identity, bad.identity);
        assert_eq!(found[0].missing, vec![MissingField::Age]);
    }
}
