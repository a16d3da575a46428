//! Ledger listing filters and pagination.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::compliance::MissingField;
use crate::record::LedgerRecord;

/// Transaction-type filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionFilter {
    #[default]
    All,
    /// Records with no sale yet.
    PurchaseOnly,
    /// Records with at least one sale.
    WithSale,
}

/// Record filter. Every text filter is a case-insensitive substring match;
/// `None` or blank means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFilter {
    /// Inclusive; matches when any event falls on or after this date (UTC).
    #[serde(default)]
    pub from: Option<NaiveDate>,
    /// Inclusive; matches when any event falls on or before this date (UTC).
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub transaction: TransactionFilter,
    /// Console, software or color.
    #[serde(default)]
    pub product: Option<String>,
    /// Lot id or any management number.
    #[serde(default)]
    pub lot: Option<String>,
    /// Counterpart or buyer name.
    #[serde(default)]
    pub party: Option<String>,
}

fn needle(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

impl LedgerFilter {
    pub fn matches(&self, record: &LedgerRecord) -> bool {
        if self.from.is_some() || self.to.is_some() {
            let in_range = record.event_dates.iter().any(|at| {
                let day = at.date_naive();
                self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
            });
            if !in_range {
                return false;
            }
        }

        let has_sale = record.last_sale_at.is_some();
        match self.transaction {
            TransactionFilter::All => {}
            TransactionFilter::PurchaseOnly if has_sale => return false,
            TransactionFilter::WithSale if !has_sale => return false,
            _ => {}
        }

        if let Some(n) = needle(&self.product) {
            if !record.descriptor.as_ref().is_some_and(|d| d.contains_text(&n)) {
                return false;
            }
        }

        if let Some(n) = needle(&self.lot) {
            let by_id = contains(&record.identity.to_string(), &n);
            let by_number = record.management_numbers.iter().any(|m| contains(m, &n));
            if !by_id && !by_number {
                return false;
            }
        }

        if let Some(n) = needle(&self.party) {
            let by_counterpart = record.counterpart.as_ref().is_some_and(|c| contains(&c.name, &n));
            let by_buyer = record.buyers.iter().any(|b| contains(b, &n));
            if !by_counterpart && !by_buyer {
                return false;
            }
        }

        true
    }
}

/// 1-based page request. `size == 0` returns every row on page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn all() -> Self {
        Self { page: 1, size: 0 }
    }

    pub fn new(page: usize, size: usize) -> Self {
        Self { page: page.max(1), size }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::all()
    }
}

/// A record with its compliance badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub record: LedgerRecord,
    pub missing: Vec<MissingField>,
}

impl LedgerRow {
    pub fn is_compliant(&self) -> bool {
        self.missing.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPage {
    pub rows: Vec<LedgerRow>,
    /// Matching rows across all pages.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl LedgerPage {
    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            return 1;
        }
        self.total.div_ceil(self.page_size).max(1)
    }

    pub(crate) fn slice(rows: Vec<LedgerRow>, page: PageRequest) -> Self {
        let total = rows.len();
        let page_no = page.page.max(1);
        let rows = if page.size == 0 {
            rows
        } else {
            rows.into_iter()
                .skip((page_no - 1).saturating_mul(page.size))
                .take(page.size)
                .collect()
        };
        Self {
            rows,
            total,
            page: page_no,
            page_size: page.size,
        }
    }
}

/// Newest activity first: last sale, else first purchase. Identity breaks ties.
pub(crate) fn sort_records(records: &mut [LedgerRecord]) {
    records.sort_by(|a, b| {
        b.activity_at()
            .cmp(&a.activity_at())
            .then_with(|| a.identity.cmp(&b.identity))
    });
}
