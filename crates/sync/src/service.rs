use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RemoteError;
use crate::types::{OutboundShipment, QuantityUpdate, RemoteItem, RemoteRecord};

/// The external inventory-tracking service.
///
/// Create/update calls carry an idempotency key; the service must treat a
/// repeated key as the same request.
#[async_trait]
pub trait InventoryService: Send + Sync {
    async fn create_outbound(&self, key: Uuid, shipment: &OutboundShipment) -> Result<RemoteRecord, RemoteError>;

    async fn update_quantity(&self, key: Uuid, update: &QuantityUpdate) -> Result<RemoteRecord, RemoteError>;

    /// One page of remote items. `page` is 1-based.
    async fn list_page(&self, page: u32, page_size: u32) -> Result<Vec<RemoteItem>, RemoteError>;
}

#[async_trait]
impl<S> InventoryService for Arc<S>
where
    S: InventoryService + ?Sized,
{
    async fn create_outbound(&self, key: Uuid, shipment: &OutboundShipment) -> Result<RemoteRecord, RemoteError> {
        (**self).create_outbound(key, shipment).await
    }

    async fn update_quantity(&self, key: Uuid, update: &QuantityUpdate) -> Result<RemoteRecord, RemoteError> {
        (**self).update_quantity(key, update).await
    }

    async fn list_page(&self, page: u32, page_size: u32) -> Result<Vec<RemoteItem>, RemoteError> {
        (**self).list_page(page, page_size).await
    }
}
