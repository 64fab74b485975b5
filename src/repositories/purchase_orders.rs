use async_trait::async_trait;
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::{
    config::ClientConfig,
    errors::ServiceError,
    http_client::ApiClient,
    models::{
        normalize, unwrap_data, Document, DocumentUpload, EntityId, Product, PurchaseOrderDetail,
        PurchaseOrderRef, Supplier, Warehouse,
    },
};

pub const PURCHASE_ORDERS_PATH: &str = "/api/v1/purchase-orders/get-purchase-orders";
pub const PURCHASE_ORDER_DETAIL_PATH: &str = "/api/v1/purchase-orders/get-purchase-order-by-id";
pub const WAREHOUSES_PATH: &str = "/api/v1/warehouses/get-warehouses";
pub const SUPPLIERS_PATH: &str = "/api/v1/suppliers/get-suppliers";
pub const PRODUCTS_PATH: &str = "/api/v1/products/get-products";
pub const UPLOAD_DOCUMENT_PATH: &str = "/api/v1/documents/upload-document";

/// Reference data and document storage the receipt form depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchaseOrderGateway: Send + Sync {
    async fn list_orders(&self) -> Result<Vec<PurchaseOrderRef>, ServiceError>;

    /// Expanded order with its supplier, warehouse and product lines.
    async fn get_order_by_id(&self, id: &EntityId) -> Result<Option<PurchaseOrderDetail>, ServiceError>;

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, ServiceError>;

    async fn list_suppliers(&self) -> Result<Vec<Supplier>, ServiceError>;

    async fn list_products(&self) -> Result<Vec<Product>, ServiceError>;

    /// Stores a file and returns the handle a receipt refers to it by.
    async fn upload_document(&self, upload: DocumentUpload) -> Result<Document, ServiceError>;
}

#[derive(Clone, Debug)]
pub struct HttpPurchaseOrderGateway {
    client: ApiClient,
}

impl HttpPurchaseOrderGateway {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ServiceError> {
        Ok(Self::new(ApiClient::new(config)?))
    }

    async fn fetch_all<T: DeserializeOwned>(&self, path: &str, action: &str) -> Result<Vec<T>, ServiceError> {
        let response = self.client.get_json(path, &[], action).await?;
        normalize(response).map_err(|e| {
            error!("{} returned unusable data: {}", action, e);
            e
        })
    }
}

#[async_trait]
impl PurchaseOrderGateway for HttpPurchaseOrderGateway {
    #[instrument(skip(self))]
    async fn list_orders(&self) -> Result<Vec<PurchaseOrderRef>, ServiceError> {
        self.fetch_all(PURCHASE_ORDERS_PATH, "Load purchase orders").await
    }

    #[instrument(skip(self))]
    async fn get_order_by_id(&self, id: &EntityId) -> Result<Option<PurchaseOrderDetail>, ServiceError> {
        let query = [("id", id.to_string())];
        match self
            .client
            .get_json(PURCHASE_ORDER_DETAIL_PATH, &query, "Load purchase order")
            .await
        {
            Ok(response) => unwrap_data(response),
            Err(ServiceError::NotFound(_)) => Ok(None),
            Err(e) => {
                error!("Failed to load purchase order {}: {}", id, e);
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, ServiceError> {
        self.fetch_all(WAREHOUSES_PATH, "Load warehouses").await
    }

    #[instrument(skip(self))]
    async fn list_suppliers(&self) -> Result<Vec<Supplier>, ServiceError> {
        self.fetch_all(SUPPLIERS_PATH, "Load suppliers").await
    }

    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, ServiceError> {
        self.fetch_all(PRODUCTS_PATH, "Load products").await
    }

    #[instrument(skip(self, upload), fields(file_name = %upload.file_name, bytes = upload.bytes.len()))]
    async fn upload_document(&self, upload: DocumentUpload) -> Result<Document, ServiceError> {
        let action = "Upload document";
        let file_name = upload.file_name.clone();

        let mut part = multipart::Part::bytes(upload.bytes).file_name(file_name.clone());
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part.mime_str(content_type).map_err(|e| {
                ServiceError::ValidationError(format!("invalid content type '{}': {}", content_type, e))
            })?;
        }
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post_multipart(UPLOAD_DOCUMENT_PATH, form, action)
            .await?;

        let mut document = match response {
            handle @ Value::String(_) => serde_json::from_value::<Document>(handle)?,
            other => unwrap_data::<Document>(other)?.ok_or_else(|| {
                ServiceError::ExternalApiError(format!("{} failed: no document handle returned", action))
            })?,
        };
        // a bare handle carries no display name of its own
        if document.name == document.id.as_str() {
            document.name = file_name;
        }

        info!(document_id = %document.id, "Uploaded document {}", document.name);
        Ok(document)
    }
}
