use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{datetime, ids::EntityId, status::GoodsReceiptStatus};
use crate::errors::DraftIssue;

/// Reference to another entity as embedded in a receipt response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedRef {
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl NamedRef {
    pub fn label(&self) -> &str {
        self.code
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or_else(|| self.id.as_str())
    }
}

/// One product entry within a receipt.
///
/// `total_price` is always `quantity * unit_price`. The handling fee is carried
/// alongside and does not take part in any total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "LineItemRecord")]
pub struct LineItem {
    pub product_id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub location: String,
    pub stack: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub fee: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Operator input for a new or edited line item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineItemInput {
    pub product_id: Option<EntityId>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub location: String,
    pub stack: u32,
    pub fee: Decimal,
    pub note: Option<String>,
}

impl LineItemInput {
    pub fn new(product_id: impl Into<EntityId>, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            product_id: Some(product_id.into()),
            quantity,
            unit_price,
            stack: 1,
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_stack(mut self, stack: u32) -> Self {
        self.stack = stack;
        self
    }

    pub fn with_fee(mut self, fee: Decimal) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl LineItem {
    /// Builds a line item from operator input, computing its total.
    pub fn from_input(input: LineItemInput) -> Result<Self, DraftIssue> {
        let product_id = EntityId::non_blank(input.product_id).ok_or(DraftIssue::MissingProduct)?;
        if input.quantity == 0 {
            return Err(DraftIssue::InvalidQuantity);
        }
        if input.unit_price.is_sign_negative() && !input.unit_price.is_zero() {
            return Err(DraftIssue::NegativeUnitPrice);
        }
        if input.stack == 0 {
            return Err(DraftIssue::InvalidStack);
        }
        if input.fee.is_sign_negative() && !input.fee.is_zero() {
            return Err(DraftIssue::NegativeFee);
        }

        let total_price =
            line_total(input.quantity, input.unit_price).ok_or(DraftIssue::LineTotalTooLarge)?;

        Ok(Self {
            product_id,
            product_name: None,
            quantity: input.quantity,
            unit_price: input.unit_price,
            total_price,
            location: input.location.trim().to_string(),
            stack: input.stack,
            fee: input.fee,
            note: input.note.filter(|n| !n.trim().is_empty()),
        })
    }

    pub fn with_product_name(mut self, name: Option<String>) -> Self {
        self.product_name = name;
        self
    }

    /// Input that reproduces this line, used when an existing line is edited.
    pub fn to_input(&self) -> LineItemInput {
        LineItemInput {
            product_id: Some(self.product_id.clone()),
            quantity: self.quantity,
            unit_price: self.unit_price,
            location: self.location.clone(),
            stack: self.stack,
            fee: self.fee,
            note: self.note.clone(),
        }
    }
}

fn line_total(quantity: u32, unit_price: Decimal) -> Option<Decimal> {
    Decimal::from(quantity).checked_mul(unit_price)
}

/// Sum of the line totals. Fees are not included.
pub fn sub_total(items: &[LineItem]) -> Result<Decimal, DraftIssue> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.total_price))
        .ok_or(DraftIssue::SubTotalTooLarge)
}

fn default_stack() -> u32 {
    1
}

/// Line item as the backend may send it: the product either flat or nested.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineItemRecord {
    #[serde(default)]
    product_id: Option<EntityId>,
    #[serde(default)]
    product: Option<NamedRef>,
    #[serde(default)]
    product_name: Option<String>,
    quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    unit_price: Decimal,
    #[serde(default)]
    location: Option<String>,
    #[serde(default = "default_stack")]
    stack: u32,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    fee: Option<Decimal>,
    #[serde(default)]
    note: Option<String>,
}

impl TryFrom<LineItemRecord> for LineItem {
    type Error = String;

    fn try_from(record: LineItemRecord) -> Result<Self, Self::Error> {
        let product_name = record
            .product_name
            .or_else(|| record.product.as_ref().and_then(|p| p.name.clone()));
        let product_id = record
            .product_id
            .or(record.product.map(|p| p.id))
            .ok_or_else(|| "line item without productId".to_string())?;

        // totals are derived, whatever the server echoed back
        let total_price = line_total(record.quantity, record.unit_price)
            .ok_or_else(|| format!("line total of product {} overflows", product_id))?;

        Ok(Self {
            product_id,
            product_name,
            quantity: record.quantity,
            unit_price: record.unit_price,
            total_price,
            location: record.location.unwrap_or_default(),
            stack: record.stack,
            fee: record.fee.unwrap_or_default(),
            note: record.note,
        })
    }
}

/// Handle of an uploaded supporting document plus its display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DocumentRecord")]
pub struct Document {
    pub id: EntityId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Document {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentRecord {
    Handle(EntityId),
    Object(DocumentObject),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentObject {
    id: EntityId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl From<DocumentRecord> for Document {
    fn from(record: DocumentRecord) -> Self {
        match record {
            DocumentRecord::Handle(id) => Self {
                name: id.to_string(),
                id,
                url: None,
            },
            DocumentRecord::Object(obj) => Self {
                name: obj
                    .name
                    .or(obj.file_name)
                    .unwrap_or_else(|| obj.id.to_string()),
                id: obj.id,
                url: obj.url,
            },
        }
    }
}

/// A file to hand to the external upload service.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Full goods receipt as returned by the detail endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoodsReceipt {
    pub id: EntityId,
    #[serde(default, alias = "receiptCode")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "datetime::deserialize_optional")]
    pub receipt_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: GoodsReceiptStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, alias = "items")]
    pub products: Vec<LineItem>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub purchase_order: Option<NamedRef>,
    #[serde(default)]
    pub purchase_order_id: Option<EntityId>,
    #[serde(default)]
    pub warehouse: Option<NamedRef>,
    #[serde(default)]
    pub warehouse_id: Option<EntityId>,
    #[serde(default)]
    pub supplier: Option<NamedRef>,
    #[serde(default)]
    pub supplier_id: Option<EntityId>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub sub_total: Decimal,
}

fn effective_id<'a>(flat: &'a Option<EntityId>, nested: &'a Option<NamedRef>) -> Option<&'a EntityId> {
    flat.as_ref()
        .filter(|id| !id.is_blank())
        .or(nested.as_ref().map(|r| &r.id))
}

impl GoodsReceipt {
    pub fn purchase_order_ref(&self) -> Option<&EntityId> {
        effective_id(&self.purchase_order_id, &self.purchase_order)
    }

    pub fn warehouse_ref(&self) -> Option<&EntityId> {
        effective_id(&self.warehouse_id, &self.warehouse)
    }

    pub fn supplier_ref(&self) -> Option<&EntityId> {
        effective_id(&self.supplier_id, &self.supplier)
    }

    /// Subtotal derived from the line items rather than the stored field.
    pub fn computed_sub_total(&self) -> Result<Decimal, DraftIssue> {
        sub_total(&self.products)
    }

    pub fn display_code(&self) -> &str {
        self.code.as_deref().unwrap_or_else(|| self.id.as_str())
    }
}

/// Row of the receipt list and search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSummary {
    pub id: EntityId,
    #[serde(default, alias = "receiptCode")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "datetime::deserialize_optional")]
    pub receipt_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: GoodsReceiptStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub purchase_order: Option<NamedRef>,
    #[serde(default)]
    pub supplier: Option<NamedRef>,
    #[serde(default)]
    pub warehouse: Option<NamedRef>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub sub_total: Decimal,
}

impl ReceiptSummary {
    pub fn display_code(&self) -> &str {
        self.code.as_deref().unwrap_or_else(|| self.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn line_total_is_quantity_times_unit_price() {
        let item = LineItem::from_input(LineItemInput::new("A", 5, dec!(100))).unwrap();
        assert_eq!(item.total_price, dec!(500));
    }

    #[test]
    fn fee_is_kept_out_of_totals() {
        let item = LineItem::from_input(LineItemInput::new("A", 2, dec!(10)).with_fee(dec!(7.5)))
            .unwrap();
        assert_eq!(item.total_price, dec!(20));
        assert_eq!(sub_total(&[item]), Ok(dec!(20)));
    }

    #[test]
    fn oversized_totals_are_rejected_instead_of_overflowing() {
        assert_eq!(
            LineItem::from_input(LineItemInput::new("A", 2, Decimal::MAX)),
            Err(DraftIssue::LineTotalTooLarge)
        );

        let big = LineItem::from_input(LineItemInput::new("A", 1, Decimal::MAX)).unwrap();
        assert_eq!(sub_total(&[big.clone(), big]), Err(DraftIssue::SubTotalTooLarge));

        let decoded = serde_json::from_value::<LineItem>(json!({
            "productId": "A",
            "quantity": 3,
            "unitPrice": "79228162514264337593543950335"
        }));
        assert!(decoded.is_err());
    }

    #[test]
    fn input_validation_names_the_field() {
        let mut no_product = LineItemInput::new("A", 1, dec!(1));
        no_product.product_id = None;
        assert_eq!(
            LineItem::from_input(no_product),
            Err(DraftIssue::MissingProduct)
        );
        assert_eq!(
            LineItem::from_input(LineItemInput::new("A", 0, dec!(1))),
            Err(DraftIssue::InvalidQuantity)
        );
        assert_eq!(
            LineItem::from_input(LineItemInput::new("A", 1, dec!(-1))),
            Err(DraftIssue::NegativeUnitPrice)
        );
        assert_eq!(
            LineItem::from_input(LineItemInput::new("A", 1, dec!(1)).with_stack(0)),
            Err(DraftIssue::InvalidStack)
        );
        assert_eq!(
            LineItem::from_input(LineItemInput::new("A", 1, dec!(1)).with_fee(dec!(-2))),
            Err(DraftIssue::NegativeFee)
        );
    }

    #[test]
    fn decoded_line_recomputes_stale_total() {
        let item: LineItem = serde_json::from_value(json!({
            "product": {"id": 7, "name": "Bolt"},
            "quantity": 3,
            "unitPrice": "2.50",
            "totalPrice": 999,
            "location": "A-01",
            "stack": 2
        }))
        .unwrap();

        assert_eq!(item.product_id, EntityId::from("7"));
        assert_eq!(item.product_name.as_deref(), Some("Bolt"));
        assert_eq!(item.total_price, dec!(7.5));
        assert_eq!(item.fee, Decimal::ZERO);
    }

    #[test]
    fn documents_decode_from_handles_or_objects() {
        let docs: Vec<Document> = serde_json::from_value(json!([
            "doc-1",
            {"id": "doc-2", "fileName": "invoice.pdf", "url": "https://files/doc-2"}
        ]))
        .unwrap();

        assert_eq!(docs[0], Document::new("doc-1", "doc-1"));
        assert_eq!(docs[1].name, "invoice.pdf");
        assert_eq!(docs[1].url.as_deref(), Some("https://files/doc-2"));
    }

    #[test]
    fn receipt_references_resolve_flat_or_nested() {
        let receipt: GoodsReceipt = serde_json::from_value(json!({
            "id": 1,
            "receiptCode": "PN-2024-001",
            "receiptDate": "2024-05-01T08:00:00",
            "status": "DRAFT",
            "purchaseOrder": {"id": "PO-001", "code": "PO-001"},
            "warehouseId": "WH-1",
            "supplier": {"id": "SUP-9", "name": "Acme"},
            "products": [],
            "subTotal": 0
        }))
        .unwrap();

        assert_eq!(receipt.display_code(), "PN-2024-001");
        assert_eq!(receipt.purchase_order_ref(), Some(&EntityId::from("PO-001")));
        assert_eq!(receipt.warehouse_ref(), Some(&EntityId::from("WH-1")));
        assert_eq!(receipt.supplier_ref(), Some(&EntityId::from("SUP-9")));
    }
}
