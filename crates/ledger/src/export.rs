//! CSV export of ledger rows.

use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::query::LedgerRow;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One exported line. Field order is the column order.
#[derive(Debug, Serialize)]
struct ExportLine<'a> {
    identity: String,
    status: &'static str,
    transaction_date: String,
    last_sale_date: String,
    item_description: String,
    color: &'a str,
    rank: &'static str,
    management_numbers: String,
    purchased_quantity: i64,
    sold_quantity: i64,
    unit_price: String,
    counterpart_name: &'a str,
    address: &'a str,
    occupation: &'a str,
    age: String,
    id_document: &'a str,
    buyers: String,
    cost: i64,
    revenue: i64,
    shipping: i64,
    profit: i64,
    compliant: bool,
    missing_fields: String,
}

fn date(at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    at.map(|t| t.date_naive().to_string()).unwrap_or_default()
}

impl<'a> ExportLine<'a> {
    fn from_row(row: &'a LedgerRow, as_of: NaiveDate) -> Self {
        let r = &row.record;
        let cp = r.counterpart.as_ref();
        Self {
            identity: r.identity.to_string(),
            status: r.status.as_str(),
            transaction_date: date(r.transaction_at()),
            last_sale_date: date(r.last_sale_at),
            item_description: r.descriptor.as_ref().map(|d| d.description()).unwrap_or_default(),
            color: r.descriptor.as_ref().and_then(|d| d.color.as_deref()).unwrap_or(""),
            rank: r.rank.map(|k| k.as_str()).unwrap_or(""),
            management_numbers: r.management_numbers.join(";"),
            purchased_quantity: r.purchased_quantity,
            sold_quantity: r.sold_quantity,
            unit_price: r.unit_price.map(|p| p.to_string()).unwrap_or_default(),
            counterpart_name: cp.map(|c| c.name.as_str()).unwrap_or(""),
            address: cp.and_then(|c| c.address.as_deref()).unwrap_or(""),
            occupation: cp.and_then(|c| c.occupation.as_deref()).unwrap_or(""),
            age: cp.and_then(|c| c.age_on(as_of)).map(|a| a.to_string()).unwrap_or_default(),
            id_document: cp.and_then(|c| c.id_document.as_deref()).unwrap_or(""),
            buyers: r.buyers.join(";"),
            cost: r.cost_of_sales.units(),
            revenue: r.revenue.units(),
            shipping: r.shipping.units(),
            profit: r.profit.units(),
            compliant: row.is_compliant(),
            missing_fields: row.missing.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(";"),
        }
    }
}

/// Write `rows` as CSV with a header line. Output depends only on the rows
/// and `as_of`.
pub fn export_csv<W: Write>(rows: &[LedgerRow], as_of: NaiveDate, writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        wtr.write_record(HEADER)?;
    }
    for row in rows {
        wtr.serialize(ExportLine::from_row(row, as_of))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Column names, matching `ExportLine` field order.
pub const HEADER: [&str; 23] = [
    "identity",
    "status",
    "transaction_date",
    "last_sale_date",
    "item_description",
    "color",
    "rank",
    "management_numbers",
    "purchased_quantity",
    "sold_quantity",
    "unit_price",
    "counterpart_name",
    "address",
    "occupation",
    "age",
    "id_document",
    "buyers",
    "cost",
    "revenue",
    "shipping",
    "profit",
    "compliant",
    "missing_fields",
];
