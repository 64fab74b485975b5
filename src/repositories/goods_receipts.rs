use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::{
    config::ClientConfig,
    errors::ServiceError,
    http_client::ApiClient,
    models::{normalize, unwrap_data, EntityId, GoodsReceipt, ReceiptPayload, ReceiptSummary, ServerResult},
};

pub const LIST_PATH: &str = "/api/v1/goods-receipts/get-goods-receipts";
pub const SEARCH_PATH: &str = "/api/v1/goods-receipts/search-goods-receipts";
pub const DETAIL_PATH: &str = "/api/v1/goods-receipts/get-goods-receipt-by-id";
pub const CREATE_PATH: &str = "/api/v1/goods-receipts/create-goods-receipt";
pub const UPDATE_PATH: &str = "/api/v1/goods-receipts/update-goods-receipt";
pub const CHANGE_STATUS_PATH: &str = "/api/v1/goods-receipts/change-goods-receipt-status";

const SORT_BY_RECEIPT_DATE_DESC: &str = "receiptDate,desc";

/// Reads and writes against the goods-receipt resource.
///
/// Implementations hold no state of their own. Failures are logged and returned
/// so the caller decides what the operator sees.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GoodsReceiptRepository: Send + Sync {
    /// First page of receipts, newest receipt date first.
    async fn list(&self) -> Result<Vec<ReceiptSummary>, ServiceError>;

    async fn search(&self, keyword: &str) -> Result<Vec<ReceiptSummary>, ServiceError>;

    /// `Ok(None)` when the backend has no such receipt.
    async fn get_by_id(&self, id: &EntityId) -> Result<Option<GoodsReceipt>, ServiceError>;

    async fn create(&self, payload: &ReceiptPayload) -> Result<ServerResult, ServiceError>;

    async fn update(&self, payload: &ReceiptPayload) -> Result<ServerResult, ServiceError>;

    /// Asks the backend to approve a draft. The backend picks the resulting status.
    async fn change_status(&self, id: &EntityId) -> Result<ServerResult, ServiceError>;
}

/// [`GoodsReceiptRepository`] over the REST backend.
#[derive(Clone, Debug)]
pub struct HttpGoodsReceiptRepository {
    client: ApiClient,
    page_size: u32,
}

impl HttpGoodsReceiptRepository {
    pub fn new(client: ApiClient, page_size: u32) -> Self {
        Self { client, page_size }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ServiceError> {
        Ok(Self::new(ApiClient::new(config)?, config.list_page_size))
    }

    fn page_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", "0".to_string()),
            ("size", self.page_size.to_string()),
            ("sort", SORT_BY_RECEIPT_DATE_DESC.to_string()),
        ]
    }

    /// Fetches a collection, degrading an unrecognised envelope to an empty result.
    async fn fetch_collection(
        &self,
        path: &str,
        query: &[(&str, String)],
        action: &str,
    ) -> Result<Vec<ReceiptSummary>, ServiceError> {
        let response = self.client.get_json(path, query, action).await.map_err(|e| {
            error!("{} failed: {}", action, e);
            e
        })?;

        match normalize::<ReceiptSummary>(response) {
            Ok(receipts) => Ok(receipts),
            Err(ServiceError::ShapeError(shape)) => {
                warn!("{} returned an unexpected response shape ({}); treating as empty", action, shape);
                Ok(Vec::new())
            }
            Err(e) => {
                error!("{} returned undecodable receipts: {}", action, e);
                Err(e)
            }
        }
    }

    async fn submit(
        &self,
        path: &str,
        payload: &ReceiptPayload,
        action: &str,
    ) -> Result<ServerResult, ServiceError> {
        let response = self.client.post_json(path, payload, action).await.map_err(|e| {
            error!("{} failed: {}", action, e);
            e
        })?;
        let result = ServerResult::from_response(response, action).map_err(|e| {
            error!("{} rejected: {}", action, e);
            e
        })?;
        info!(
            receipt_id = ?result.entity_id().or_else(|| payload.id.clone()),
            line_items = payload.products.len(),
            "{} succeeded",
            action
        );
        Ok(result)
    }
}

#[async_trait]
impl GoodsReceiptRepository for HttpGoodsReceiptRepository {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<ReceiptSummary>, ServiceError> {
        self.fetch_collection(LIST_PATH, &self.page_query(), "Load goods receipts")
            .await
    }

    #[instrument(skip(self))]
    async fn search(&self, keyword: &str) -> Result<Vec<ReceiptSummary>, ServiceError> {
        let mut query = self.page_query();
        query.push(("keyword", keyword.trim().to_string()));
        self.fetch_collection(SEARCH_PATH, &query, "Search goods receipts")
            .await
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: &EntityId) -> Result<Option<GoodsReceipt>, ServiceError> {
        let query = [("id", id.to_string())];
        match self.client.get_json(DETAIL_PATH, &query, "Load goods receipt").await {
            Ok(response) => unwrap_data(response).map_err(|e| {
                error!("Goods receipt {} could not be decoded: {}", id, e);
                e
            }),
            Err(ServiceError::NotFound(_)) => Ok(None),
            Err(e) => {
                error!("Failed to load goods receipt {}: {}", id, e);
                Err(e)
            }
        }
    }

    #[instrument(skip(self, payload))]
    async fn create(&self, payload: &ReceiptPayload) -> Result<ServerResult, ServiceError> {
        self.submit(CREATE_PATH, payload, "Create goods receipt").await
    }

    #[instrument(skip(self, payload), fields(receipt_id = ?payload.id))]
    async fn update(&self, payload: &ReceiptPayload) -> Result<ServerResult, ServiceError> {
        if payload.id.is_none() {
            return Err(ServiceError::InvalidOperation(
                "update requires the receipt id".to_string(),
            ));
        }
        self.submit(UPDATE_PATH, payload, "Update goods receipt").await
    }

    #[instrument(skip(self))]
    async fn change_status(&self, id: &EntityId) -> Result<ServerResult, ServiceError> {
        let action = "Approve goods receipt";
        let response = self
            .client
            .post_json(CHANGE_STATUS_PATH, &json!({ "id": id }), action)
            .await
            .map_err(|e| {
                error!("Failed to change status of goods receipt {}: {}", id, e);
                e
            })?;
        let result = ServerResult::from_response(response, action).map_err(|e| {
            error!("Status change of goods receipt {} rejected: {}", id, e);
            e
        })?;
        info!("Goods receipt {} submitted for approval", id);
        Ok(result)
    }
}
