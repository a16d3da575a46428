//! Payloads exchanged with the external inventory service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lotkeeper_core::{BuyerRef, LotId, SaleId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentLine {
    pub lot_id: LotId,
    /// Id of the lot in the external service, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub management_numbers: Vec<String>,
    /// Customs fields from the product master, for cross-border shipments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_of_origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Outbound shipment record created remotely for each finalized sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundShipment {
    pub sale_id: SaleId,
    pub buyer: BuyerRef,
    pub shipped_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_method: Option<String>,
    pub lines: Vec<ShipmentLine>,
}

impl OutboundShipment {
    /// Local reference the idempotency key is derived from.
    pub fn reference(&self) -> String {
        format!("sale:{}", self.sale_id)
    }
}

/// Absolute on-hand quantity for one lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityUpdate {
    pub lot_id: LotId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub quantity: u32,
    /// What caused the change (a sale id, an intake). Sent to the remote
    /// service but not part of the reference.
    pub cause: String,
}

impl QuantityUpdate {
    /// A lot's on-hand count only falls after intake, so the lot and the
    /// absolute quantity identify one state change. Replays of it share the
    /// key; a later change never does.
    pub fn reference(&self) -> String {
        format!("lot:{}:quantity:{}", self.lot_id, self.quantity)
    }
}

/// Remote acknowledgement of a create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
}

/// One inventory item as listed by the external service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
