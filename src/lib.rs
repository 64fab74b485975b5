//! Goods Receipts Library
//!
//! Client-side workflow for recording goods received against purchase orders:
//! listing and searching receipts, editing drafts, attaching documents and
//! approving drafts, all against the inventory backend's REST API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod debounce;
pub mod errors;
pub mod http_client;
pub mod models;
pub mod repositories;
pub mod services;

use std::sync::Arc;

pub use self::config::{init_tracing, load_config, ClientConfig};
pub use errors::{DraftIssue, ServiceError};

use repositories::{
    GoodsReceiptRepository, HttpGoodsReceiptRepository, HttpPurchaseOrderGateway,
    PurchaseOrderGateway,
};
use services::{ReceiptDetailLoader, ReceiptFormController, ReceiptListController};

/// Shared handles for the receipt views, all talking to one backend.
#[derive(Clone)]
pub struct ReceiptServices {
    pub config: ClientConfig,
    pub receipts: Arc<dyn GoodsReceiptRepository>,
    pub purchase_orders: Arc<dyn PurchaseOrderGateway>,
}

impl ReceiptServices {
    pub fn new(
        config: ClientConfig,
        receipts: Arc<dyn GoodsReceiptRepository>,
        purchase_orders: Arc<dyn PurchaseOrderGateway>,
    ) -> Self {
        Self {
            config,
            receipts,
            purchase_orders,
        }
    }

    /// Wires the HTTP repositories from configuration.
    pub fn from_config(config: ClientConfig) -> Result<Self, ServiceError> {
        let client = http_client::ApiClient::new(&config)?;
        let receipts = HttpGoodsReceiptRepository::new(client.clone(), config.list_page_size);
        let purchase_orders = HttpPurchaseOrderGateway::new(client);
        Ok(Self::new(config, Arc::new(receipts), Arc::new(purchase_orders)))
    }

    pub fn list_controller(&self) -> Arc<ReceiptListController> {
        ReceiptListController::new(self.receipts.clone(), self.config.search_debounce())
    }

    pub fn form_controller(&self) -> ReceiptFormController {
        ReceiptFormController::new(self.receipts.clone(), self.purchase_orders.clone())
    }

    pub fn detail_loader(&self) -> ReceiptDetailLoader {
        ReceiptDetailLoader::new(self.receipts.clone())
    }
}
