use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{datetime, goods_receipt::NamedRef, ids::EntityId};

/// Purchase order as listed in the order picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderRef {
    pub id: EntityId,
    #[serde(default, alias = "poNumber")]
    pub order_number: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "datetime::deserialize_optional")]
    pub order_date: Option<DateTime<Utc>>,
}

impl PurchaseOrderRef {
    pub fn label(&self) -> &str {
        self.order_number
            .as_deref()
            .or(self.code.as_deref())
            .unwrap_or_else(|| self.id.as_str())
    }
}

/// Product line on a purchase order, used to restrict and pre-fill receipt lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PurchaseOrderLineRecord")]
pub struct PurchaseOrderLine {
    pub product_id: EntityId,
    pub product_name: Option<String>,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseOrderLineRecord {
    #[serde(default)]
    product_id: Option<EntityId>,
    #[serde(default)]
    product: Option<NamedRef>,
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    quantity: u32,
    #[serde(default, alias = "price", with = "rust_decimal::serde::float_option")]
    unit_price: Option<Decimal>,
}

impl TryFrom<PurchaseOrderLineRecord> for PurchaseOrderLine {
    type Error = String;

    fn try_from(record: PurchaseOrderLineRecord) -> Result<Self, Self::Error> {
        let product_name = record
            .product_name
            .or_else(|| record.product.as_ref().and_then(|p| p.name.clone()));
        let product_id = record
            .product_id
            .or(record.product.map(|p| p.id))
            .ok_or_else(|| "purchase order line without productId".to_string())?;

        Ok(Self {
            product_id,
            product_name,
            quantity: record.quantity,
            unit_price: record.unit_price.unwrap_or_default(),
        })
    }
}

/// Expanded purchase order, authoritative for supplier, default warehouse and
/// the products a receipt may contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderDetail {
    pub id: EntityId,
    #[serde(default, alias = "poNumber")]
    pub order_number: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "datetime::deserialize_optional")]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub supplier: Option<NamedRef>,
    #[serde(default)]
    pub supplier_id: Option<EntityId>,
    #[serde(default)]
    pub warehouse: Option<NamedRef>,
    #[serde(default)]
    pub warehouse_id: Option<EntityId>,
    #[serde(default, alias = "items")]
    pub products: Vec<PurchaseOrderLine>,
}

impl PurchaseOrderDetail {
    pub fn supplier_ref(&self) -> Option<&EntityId> {
        self.supplier_id
            .as_ref()
            .filter(|id| !id.is_blank())
            .or(self.supplier.as_ref().map(|s| &s.id))
    }

    pub fn warehouse_ref(&self) -> Option<&EntityId> {
        self.warehouse_id
            .as_ref()
            .filter(|id| !id.is_blank())
            .or(self.warehouse.as_ref().map(|w| &w.id))
    }

    pub fn line_for(&self, product_id: &EntityId) -> Option<&PurchaseOrderLine> {
        self.products.iter().find(|line| &line.product_id == product_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// Catalog product. `cost` is the fallback unit price for new receipt lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "sku")]
    pub code: Option<String>,
    #[serde(default, alias = "costPrice", with = "rust_decimal::serde::float_option")]
    pub cost: Option<Decimal>,
}

/// Option sets a receipt form needs before it can be edited.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceOptions {
    pub purchase_orders: Vec<PurchaseOrderRef>,
    pub warehouses: Vec<Warehouse>,
    pub suppliers: Vec<Supplier>,
    pub products: Vec<Product>,
}

impl ReferenceOptions {
    pub fn product(&self, id: &EntityId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    pub fn has_warehouse(&self, id: &EntityId) -> bool {
        self.warehouses.iter().any(|w| &w.id == id)
    }

    pub fn has_supplier(&self, id: &EntityId) -> bool {
        self.suppliers.iter().any(|s| &s.id == id)
    }
}
