//! reqwest-backed [`InventoryService`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::RemoteError;
use crate::service::InventoryService;
use crate::types::{OutboundShipment, QuantityUpdate, RemoteItem, RemoteRecord};

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone)]
pub struct HttpInventoryService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpInventoryService {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, RemoteError> {
        let resp = self.authorized(req).send().await.map_err(transport_error)?;
        decode(resp).await
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Network(e.to_string())
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, RemoteError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        });
    }
    resp.json::<T>().await.map_err(|e| RemoteError::Decode(e.to_string()))
}

#[async_trait]
impl InventoryService for HttpInventoryService {
    async fn create_outbound(&self, key: Uuid, shipment: &OutboundShipment) -> Result<RemoteRecord, RemoteError> {
        let req = self
            .client
            .post(self.url("/outbound-shipments"))
            .header(IDEMPOTENCY_HEADER, key.to_string())
            .json(shipment);
        self.send(req).await
    }

    async fn update_quantity(&self, key: Uuid, update: &QuantityUpdate) -> Result<RemoteRecord, RemoteError> {
        let item = update
            .external_id
            .clone()
            .unwrap_or_else(|| update.lot_id.to_string());
        let req = self
            .client
            .put(self.url(&format!("/items/{item}/quantity")))
            .header(IDEMPOTENCY_HEADER, key.to_string())
            .json(update);
        self.send(req).await
    }

    async fn list_page(&self, page: u32, page_size: u32) -> Result<Vec<RemoteItem>, RemoteError> {
        let req = self
            .client
            .get(self.url("/items"))
            .query(&[("page", page), ("per_page", page_size)]);
        self.send(req).await
    }
}
