use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{goods_receipt::LineItem, ids::EntityId, status::GoodsReceiptStatus};

/// Body of the create and update calls.
///
/// `id` is only present when updating an existing receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub purchase_order_id: EntityId,
    pub warehouse_id: EntityId,
    pub supplier_id: EntityId,
    pub documents: Vec<EntityId>,
    pub products: Vec<LineItemPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub status: GoodsReceiptStatus,
    pub receipt_date: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    pub sub_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemPayload {
    pub product_id: EntityId,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub location: String,
    pub stack: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub fee: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl From<&LineItem> for LineItemPayload {
    fn from(item: &LineItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
            location: item.location.clone(),
            stack: item.stack,
            fee: item.fee,
            note: item.note.clone(),
        }
    }
}
