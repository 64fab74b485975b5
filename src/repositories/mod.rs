//! Stateless gateways to the backend resources the receipt workflow reads and writes.

pub mod goods_receipts;
pub mod purchase_orders;

pub use goods_receipts::{GoodsReceiptRepository, HttpGoodsReceiptRepository};
pub use purchase_orders::{HttpPurchaseOrderGateway, PurchaseOrderGateway};

#[cfg(test)]
pub use goods_receipts::MockGoodsReceiptRepository;
#[cfg(test)]
pub use purchase_orders::MockPurchaseOrderGateway;
