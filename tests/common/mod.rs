#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use goods_receipts::{
    models::{
        Document, DocumentUpload, EntityId, GoodsReceipt, GoodsReceiptStatus, Product,
        PurchaseOrderDetail, PurchaseOrderLine, PurchaseOrderRef, ReceiptPayload, ReceiptSummary,
        ServerResult, Supplier, Warehouse,
    },
    repositories::{GoodsReceiptRepository, PurchaseOrderGateway},
    ServiceError,
};
use rust_decimal::Decimal;
use serde_json::json;

/// Every call a fake received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List,
    Search(String),
    GetById(String),
    Create,
    Update(String),
    ChangeStatus(String),
}

#[derive(Default)]
struct RepositoryState {
    receipts: Vec<GoodsReceipt>,
    calls: Vec<Call>,
    created: Vec<ReceiptPayload>,
    updated: Vec<ReceiptPayload>,
    fail_next_write: Option<String>,
    approval_status: Option<GoodsReceiptStatus>,
}

/// In-memory stand-in for the receipt backend.
#[derive(Clone, Default)]
pub struct FakeReceiptRepository {
    state: Arc<Mutex<RepositoryState>>,
}

impl FakeReceiptRepository {
    pub fn with_receipts(receipts: Vec<GoodsReceipt>) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().receipts = receipts;
        fake
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn created(&self) -> Vec<ReceiptPayload> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn updated(&self) -> Vec<ReceiptPayload> {
        self.state.lock().unwrap().updated.clone()
    }

    /// The next create or update fails with `message` as the backend text.
    pub fn fail_next_write(&self, message: &str) {
        self.state.lock().unwrap().fail_next_write = Some(message.to_string());
    }

    /// Status the backend moves a draft to on approval. Defaults to RECEIVED.
    pub fn approve_to(&self, status: GoodsReceiptStatus) {
        self.state.lock().unwrap().approval_status = Some(status);
    }

    fn summaries(receipts: &[GoodsReceipt]) -> Vec<ReceiptSummary> {
        receipts.iter().map(summary_of).collect()
    }
}

pub fn summary_of(receipt: &GoodsReceipt) -> ReceiptSummary {
    ReceiptSummary {
        id: receipt.id.clone(),
        code: receipt.code.clone(),
        receipt_date: receipt.receipt_date,
        status: receipt.status,
        description: receipt.description.clone(),
        purchase_order: receipt.purchase_order.clone(),
        supplier: receipt.supplier.clone(),
        warehouse: receipt.warehouse.clone(),
        sub_total: receipt.computed_sub_total().unwrap(),
    }
}

#[async_trait]
impl GoodsReceiptRepository for FakeReceiptRepository {
    async fn list(&self) -> Result<Vec<ReceiptSummary>, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List);
        Ok(Self::summaries(&state.receipts))
    }

    async fn search(&self, keyword: &str) -> Result<Vec<ReceiptSummary>, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Search(keyword.to_string()));
        let matching: Vec<GoodsReceipt> = state
            .receipts
            .iter()
            .filter(|r| r.display_code().contains(keyword))
            .cloned()
            .collect();
        Ok(Self::summaries(&matching))
    }

    async fn get_by_id(&self, id: &EntityId) -> Result<Option<GoodsReceipt>, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::GetById(id.to_string()));
        Ok(state.receipts.iter().find(|r| &r.id == id).cloned())
    }

    async fn create(&self, payload: &ReceiptPayload) -> Result<ServerResult, ServiceError> {
        // writes suspend once, like a real request
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create);
        if let Some(message) = state.fail_next_write.take() {
            return Err(ServiceError::ExternalApiError(message));
        }
        state.created.push(payload.clone());
        let id = format!("new-{}", state.created.len());
        Ok(ServerResult {
            success: Some(true),
            message: None,
            data: json!({ "id": id }),
        })
    }

    async fn update(&self, payload: &ReceiptPayload) -> Result<ServerResult, ServiceError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        let id = payload.id.clone().map(|id| id.to_string()).unwrap_or_default();
        state.calls.push(Call::Update(id));
        if let Some(message) = state.fail_next_write.take() {
            return Err(ServiceError::ExternalApiError(message));
        }
        state.updated.push(payload.clone());
        Ok(ServerResult::default())
    }

    async fn change_status(&self, id: &EntityId) -> Result<ServerResult, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ChangeStatus(id.to_string()));
        let target = state.approval_status.unwrap_or(GoodsReceiptStatus::Received);
        let receipt = state
            .receipts
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("receipt {}", id)))?;
        receipt.status = target;
        Ok(ServerResult::default())
    }
}

#[derive(Default)]
struct GatewayState {
    orders: HashMap<String, PurchaseOrderDetail>,
    warehouses: Vec<Warehouse>,
    suppliers: Vec<Supplier>,
    products: Vec<Product>,
    uploads: Vec<String>,
    fail_uploads: bool,
    detail_requests: usize,
}

/// In-memory purchase-order service with a fixed catalog.
#[derive(Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl FakeGateway {
    /// Catalog of products A, B and C, warehouses WH-1/WH-2, suppliers SUP-1/SUP-2
    /// and the order PO-001 returned by [`po_001`].
    pub fn standard() -> Self {
        let gateway = Self::default();
        {
            let mut state = gateway.state.lock().unwrap();
            state.products = catalog();
            state.warehouses = vec![warehouse("WH-1"), warehouse("WH-2")];
            state.suppliers = vec![supplier("SUP-1"), supplier("SUP-2")];
        }
        gateway.add_order(po_001());
        gateway
    }

    pub fn add_order(&self, order: PurchaseOrderDetail) {
        self.state
            .lock()
            .unwrap()
            .orders
            .insert(order.id.to_string(), order);
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.state.lock().unwrap().fail_uploads = fail;
    }

    pub fn uploads(&self) -> Vec<String> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn detail_requests(&self) -> usize {
        self.state.lock().unwrap().detail_requests
    }
}

#[async_trait]
impl PurchaseOrderGateway for FakeGateway {
    async fn list_orders(&self) -> Result<Vec<PurchaseOrderRef>, ServiceError> {
        let state = self.state.lock().unwrap();
        let mut orders: Vec<PurchaseOrderRef> = state
            .orders
            .values()
            .map(|order| PurchaseOrderRef {
                id: order.id.clone(),
                order_number: order.order_number.clone(),
                code: order.code.clone(),
                order_date: order.order_date,
            })
            .collect();
        orders.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(orders)
    }

    async fn get_order_by_id(&self, id: &EntityId) -> Result<Option<PurchaseOrderDetail>, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.detail_requests += 1;
        Ok(state.orders.get(id.as_str()).cloned())
    }

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, ServiceError> {
        Ok(self.state.lock().unwrap().warehouses.clone())
    }

    async fn list_suppliers(&self) -> Result<Vec<Supplier>, ServiceError> {
        Ok(self.state.lock().unwrap().suppliers.clone())
    }

    async fn list_products(&self) -> Result<Vec<Product>, ServiceError> {
        Ok(self.state.lock().unwrap().products.clone())
    }

    async fn upload_document(&self, upload: DocumentUpload) -> Result<Document, ServiceError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_uploads {
            return Err(ServiceError::ExternalApiError("Storage quota exceeded".into()));
        }
        state.uploads.push(upload.file_name.clone());
        let id = format!("doc-{}", state.uploads.len());
        Ok(Document::new(id, upload.file_name))
    }
}

pub fn catalog() -> Vec<Product> {
    vec![
        product("A", Decimal::new(9000, 2)),
        product("B", Decimal::new(2550, 2)),
        product("C", Decimal::new(1000, 2)),
    ]
}

pub fn product(id: &str, cost: Decimal) -> Product {
    Product {
        id: id.into(),
        name: format!("Product {}", id),
        code: Some(format!("SKU-{}", id)),
        cost: Some(cost),
    }
}

pub fn warehouse(id: &str) -> Warehouse {
    Warehouse {
        id: id.into(),
        name: format!("Warehouse {}", id),
        code: None,
    }
}

pub fn supplier(id: &str) -> Supplier {
    Supplier {
        id: id.into(),
        name: format!("Supplier {}", id),
        code: None,
    }
}

/// PO-001: supplier SUP-1, warehouse WH-1, one line of 5 x A at 100.
pub fn po_001() -> PurchaseOrderDetail {
    PurchaseOrderDetail {
        id: "PO-001".into(),
        order_number: Some("PO-001".into()),
        code: None,
        order_date: None,
        supplier: None,
        supplier_id: Some("SUP-1".into()),
        warehouse: None,
        warehouse_id: Some("WH-1".into()),
        products: vec![PurchaseOrderLine {
            product_id: "A".into(),
            product_name: Some("Product A".into()),
            quantity: 5,
            unit_price: Decimal::from(100),
        }],
    }
}

/// Order with a supplier but no default warehouse and no product lines.
pub fn po_without_defaults(id: &str) -> PurchaseOrderDetail {
    PurchaseOrderDetail {
        id: id.into(),
        order_number: Some(id.to_string()),
        code: None,
        order_date: None,
        supplier: None,
        supplier_id: Some("SUP-2".into()),
        warehouse: None,
        warehouse_id: None,
        products: vec![],
    }
}

/// Receipt as the detail endpoint would return it.
pub fn stored_receipt(id: &str, code: &str, status: GoodsReceiptStatus, quantity: u32) -> GoodsReceipt {
    serde_json::from_value(json!({
        "id": id,
        "code": code,
        "receiptDate": "2024-05-01T08:00:00Z",
        "status": status,
        "purchaseOrderId": "PO-001",
        "warehouseId": "WH-1",
        "supplierId": "SUP-1",
        "documents": [{"id": "doc-9", "name": "delivery-note.pdf"}],
        "products": [{
            "productId": "A",
            "productName": "Product A",
            "quantity": quantity,
            "unitPrice": 100,
            "totalPrice": 100 * quantity,
            "location": "A-01",
            "stack": 1,
            "fee": 0
        }],
        "subTotal": 100 * quantity
    }))
    .expect("fixture receipt decodes")
}
