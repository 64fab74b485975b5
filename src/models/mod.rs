//! Wire and domain types for goods receipts and the reference data around them.

pub mod datetime;
pub mod envelope;
pub mod goods_receipt;
pub mod ids;
pub mod payload;
pub mod reference;
pub mod status;

pub use envelope::{normalize, unwrap_data, ServerResult};
pub use goods_receipt::{
    sub_total, Document, DocumentUpload, GoodsReceipt, LineItem, LineItemInput, NamedRef,
    ReceiptSummary,
};
pub use ids::EntityId;
pub use payload::{LineItemPayload, ReceiptPayload};
pub use reference::{
    Product, PurchaseOrderDetail, PurchaseOrderLine, PurchaseOrderRef, ReferenceOptions, Supplier,
    Warehouse,
};
pub use status::GoodsReceiptStatus;
