use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    errors::{DraftIssue, ServiceError},
    models::{
        sub_total, Document, DocumentUpload, EntityId, GoodsReceipt, GoodsReceiptStatus, LineItem,
        LineItemInput, LineItemPayload, Product, PurchaseOrderDetail, ReceiptPayload,
        ReferenceOptions,
    },
    repositories::{GoodsReceiptRepository, PurchaseOrderGateway},
    services::{
        lifecycle,
        reference_data::{products_for_order, ReferenceDataLoader},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FormMode {
    #[default]
    Closed,
    Loading,
    Ready,
    Submitting,
}

/// What the hosting view should do after the form finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    /// The draft was saved. `id` is the receipt id when the backend reported one.
    Submitted { id: Option<EntityId> },
    Cancelled,
}

/// Quantity and unit price suggested for a product about to be added.
#[derive(Debug, Clone, PartialEq)]
pub struct LineDefaults {
    pub product_id: EntityId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl LineDefaults {
    pub fn into_input(self) -> LineItemInput {
        LineItemInput::new(self.product_id, self.quantity, self.unit_price)
    }
}

/// Everything the form shows, as of the last completed operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    pub mode: FormMode,
    /// Set when an existing receipt is being edited.
    pub receipt_id: Option<EntityId>,
    pub code: Option<String>,
    pub status: GoodsReceiptStatus,
    pub receipt_date: DateTime<Utc>,
    pub description: Option<String>,
    pub note: Option<String>,
    pub purchase_order_id: Option<EntityId>,
    pub warehouse_id: Option<EntityId>,
    pub supplier_id: Option<EntityId>,
    /// True while the selected purchase order dictates the supplier.
    pub supplier_locked: bool,
    pub line_items: Vec<LineItem>,
    pub documents: Vec<Document>,
    pub sub_total: Decimal,
    pub options: ReferenceOptions,
    pub purchase_order: Option<PurchaseOrderDetail>,
    pub product_options: Vec<Product>,
}

impl FormState {
    fn blank(options: ReferenceOptions) -> Self {
        Self {
            mode: FormMode::Loading,
            receipt_date: Utc::now(),
            product_options: options.products.clone(),
            options,
            ..Default::default()
        }
    }

    pub fn is_editing(&self) -> bool {
        self.receipt_id.is_some()
    }

    fn recompute(&mut self) -> Result<(), DraftIssue> {
        self.sub_total = sub_total(&self.line_items)?;
        Ok(())
    }

    /// Swaps in a new set of line items, keeping the old set if the subtotal
    /// would not fit.
    fn replace_line_items(&mut self, line_items: Vec<LineItem>) -> Result<(), DraftIssue> {
        self.sub_total = sub_total(&line_items)?;
        self.line_items = line_items;
        Ok(())
    }

    fn apply_receipt(&mut self, receipt: GoodsReceipt) -> Result<(), DraftIssue> {
        self.purchase_order_id = receipt.purchase_order_ref().cloned();
        self.warehouse_id = receipt.warehouse_ref().cloned();
        self.supplier_id = receipt.supplier_ref().cloned();
        self.receipt_id = Some(receipt.id);
        self.code = receipt.code;
        self.status = receipt.status;
        if let Some(date) = receipt.receipt_date {
            self.receipt_date = date;
        }
        self.description = receipt.description;
        self.note = receipt.note;
        self.documents = receipt.documents;
        self.replace_line_items(receipt.products)
    }

    /// Applies an expanded order. `replace_warehouse` overwrites a warehouse the
    /// operator already chose; otherwise the order's warehouse only fills a gap.
    fn apply_purchase_order(&mut self, detail: PurchaseOrderDetail, replace_warehouse: bool) {
        self.purchase_order_id = Some(detail.id.clone());

        match detail.supplier_ref() {
            Some(supplier) => {
                self.supplier_id = Some(supplier.clone());
                self.supplier_locked = true;
            }
            None if self.supplier_locked => {
                self.supplier_id = None;
                self.supplier_locked = false;
            }
            None => {}
        }

        if let Some(warehouse) = detail.warehouse_ref() {
            if replace_warehouse || self.warehouse_id.is_none() {
                self.warehouse_id = Some(warehouse.clone());
            }
        }

        self.product_options = products_for_order(Some(&detail), &self.options.products);
        self.purchase_order = Some(detail);
    }

    fn clear_purchase_order(&mut self) {
        self.purchase_order_id = None;
        self.purchase_order = None;
        if self.supplier_locked {
            self.supplier_id = None;
            self.supplier_locked = false;
        }
        self.product_options = self.options.products.clone();
    }

    fn offered_product(&self, id: &EntityId) -> Option<&Product> {
        self.product_options.iter().find(|p| &p.id == id)
    }

    /// Checks required fields in the order the operator sees them and builds
    /// the create/update body.
    fn build_payload(&mut self) -> Result<ReceiptPayload, DraftIssue> {
        let purchase_order_id =
            EntityId::non_blank(self.purchase_order_id.clone()).ok_or(DraftIssue::MissingPurchaseOrder)?;
        let warehouse_id =
            EntityId::non_blank(self.warehouse_id.clone()).ok_or(DraftIssue::MissingWarehouse)?;
        let supplier_id =
            EntityId::non_blank(self.supplier_id.clone()).ok_or(DraftIssue::MissingSupplier)?;
        if self.line_items.is_empty() {
            return Err(DraftIssue::NoLineItems);
        }

        self.recompute()?;
        Ok(ReceiptPayload {
            id: self.receipt_id.clone(),
            purchase_order_id,
            warehouse_id,
            supplier_id,
            documents: self.documents.iter().map(|d| d.id.clone()).collect(),
            products: self.line_items.iter().map(LineItemPayload::from).collect(),
            description: non_empty(self.description.clone()),
            note: non_empty(self.note.clone()),
            status: self.status,
            receipt_date: self.receipt_date,
            sub_total: self.sub_total,
        })
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Create and edit flow for a single goods receipt draft.
///
/// The draft lives behind a mutex that is never held across a request, so the
/// controller can be shared between tasks. At most one submission runs at a
/// time; a second `submit` while one is in flight is a no-op.
pub struct ReceiptFormController {
    repository: Arc<dyn GoodsReceiptRepository>,
    reference_data: ReferenceDataLoader,
    state: Mutex<FormState>,
    submitting: AtomicBool,
}

impl ReceiptFormController {
    pub fn new(
        repository: Arc<dyn GoodsReceiptRepository>,
        gateway: Arc<dyn PurchaseOrderGateway>,
    ) -> Self {
        Self {
            repository,
            reference_data: ReferenceDataLoader::new(gateway),
            state: Mutex::new(FormState::default()),
            submitting: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FormState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Receipt form state lock was poisoned; recovering");
                poisoned.into_inner()
            }
        }
    }

    fn editable(&self) -> Result<MutexGuard<'_, FormState>, ServiceError> {
        let state = self.lock();
        if state.mode != FormMode::Ready {
            return Err(ServiceError::InvalidOperation(format!(
                "the receipt form is {:?}, not ready for changes",
                state.mode
            )));
        }
        lifecycle::ensure_editable(state.status)?;
        Ok(state)
    }

    pub fn snapshot(&self) -> FormState {
        self.lock().clone()
    }

    pub fn mode(&self) -> FormMode {
        self.lock().mode
    }

    pub fn sub_total(&self) -> Decimal {
        self.lock().sub_total
    }

    pub fn product_options(&self) -> Vec<Product> {
        self.lock().product_options.clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    /// Opens the form, blank when `receipt_id` is `None` or blank, otherwise
    /// pre-filled from the stored receipt.
    ///
    /// On failure the form stays closed and the error is returned for display.
    #[instrument(skip(self))]
    pub async fn open(&self, receipt_id: Option<EntityId>) -> Result<(), ServiceError> {
        let receipt_id = EntityId::non_blank(receipt_id);
        {
            let mut state = self.lock();
            *state = FormState {
                mode: FormMode::Loading,
                ..Default::default()
            };
        }

        match self.load_draft(receipt_id.clone()).await {
            Ok(mut draft) => {
                draft.mode = FormMode::Ready;
                info!(
                    receipt_id = ?receipt_id,
                    line_items = draft.line_items.len(),
                    "Receipt form ready"
                );
                *self.lock() = draft;
                Ok(())
            }
            Err(e) => {
                error!("Failed to open receipt form: {}", e);
                *self.lock() = FormState::default();
                Err(e)
            }
        }
    }

    async fn load_draft(&self, receipt_id: Option<EntityId>) -> Result<FormState, ServiceError> {
        let options = self.reference_data.load_options().await?;
        let mut draft = FormState::blank(options);

        if let Some(id) = receipt_id {
            let receipt = self
                .repository
                .get_by_id(&id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Goods receipt {} not found", id)))?;
            if !receipt.status.is_draft() {
                debug!(status = %receipt.status, "Opened a receipt that is no longer a draft");
            }
            draft.apply_receipt(receipt)?;

            if let Some(order_id) = draft.purchase_order_id.clone() {
                match self
                    .reference_data
                    .load_purchase_order_detail(Some(&order_id))
                    .await
                {
                    Ok(Some(detail)) => draft.apply_purchase_order(detail, false),
                    Ok(None) => {}
                    Err(ServiceError::NotFound(_)) => {
                        warn!("Purchase order {} of receipt {} no longer exists", order_id, id);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(draft)
    }

    /// Selects, or with `None` clears, the purchase order.
    ///
    /// A selected order locks the supplier, fills an empty warehouse and limits
    /// the products that can be added. Existing line items are kept.
    #[instrument(skip(self))]
    pub async fn select_purchase_order(&self, purchase_order_id: Option<EntityId>) -> Result<(), ServiceError> {
        drop(self.editable()?);
        let purchase_order_id = EntityId::non_blank(purchase_order_id);

        let detail = self
            .reference_data
            .load_purchase_order_detail(purchase_order_id.as_ref())
            .await
            .map_err(|e| {
                error!("Failed to load purchase order {:?}: {}", purchase_order_id, e);
                e
            })?;

        let mut state = self.editable()?;
        match detail {
            Some(detail) => {
                info!(
                    purchase_order_id = %detail.id,
                    ordered_products = detail.products.len(),
                    "Purchase order selected"
                );
                state.apply_purchase_order(detail, true);
            }
            None => state.clear_purchase_order(),
        }
        Ok(())
    }

    pub fn select_warehouse(&self, warehouse_id: Option<EntityId>) -> Result<(), ServiceError> {
        let mut state = self.editable()?;
        state.warehouse_id = EntityId::non_blank(warehouse_id);
        Ok(())
    }

    /// Rejected while a purchase order dictates the supplier.
    pub fn select_supplier(&self, supplier_id: Option<EntityId>) -> Result<(), ServiceError> {
        let mut state = self.editable()?;
        if state.supplier_locked {
            return Err(ServiceError::InvalidOperation(
                "the supplier is set by the selected purchase order".to_string(),
            ));
        }
        state.supplier_id = EntityId::non_blank(supplier_id);
        Ok(())
    }

    pub fn set_description(&self, description: Option<String>) -> Result<(), ServiceError> {
        self.editable()?.description = description;
        Ok(())
    }

    pub fn set_note(&self, note: Option<String>) -> Result<(), ServiceError> {
        self.editable()?.note = note;
        Ok(())
    }

    pub fn set_receipt_date(&self, receipt_date: DateTime<Utc>) -> Result<(), ServiceError> {
        self.editable()?.receipt_date = receipt_date;
        Ok(())
    }

    /// Suggested quantity and price for `product_id`: the purchase order line
    /// when there is one, otherwise one unit at catalog cost.
    pub fn line_defaults(&self, product_id: &EntityId) -> Result<LineDefaults, ServiceError> {
        let state = self.lock();
        let product = state.offered_product(product_id);

        if let Some(line) = state
            .purchase_order
            .as_ref()
            .and_then(|order| order.line_for(product_id))
        {
            return Ok(LineDefaults {
                product_id: product_id.clone(),
                product_name: product
                    .map(|p| p.name.clone())
                    .or_else(|| line.product_name.clone())
                    .unwrap_or_else(|| product_id.to_string()),
                quantity: line.quantity.max(1),
                unit_price: line.unit_price,
            });
        }

        let product = product.ok_or_else(|| {
            ServiceError::NotFound(format!("Product {} is not available for this receipt", product_id))
        })?;
        Ok(LineDefaults {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity: 1,
            unit_price: product.cost.unwrap_or_default(),
        })
    }

    /// Appends a line item and returns its index.
    pub fn add_line_item(&self, input: LineItemInput) -> Result<usize, ServiceError> {
        let mut state = self.editable()?;
        let item = LineItem::from_input(input)?;
        let name = state
            .offered_product(&item.product_id)
            .map(|p| p.name.clone())
            .ok_or_else(|| not_offered(&item.product_id))?;

        let mut line_items = state.line_items.clone();
        line_items.push(item.with_product_name(Some(name)));
        state.replace_line_items(line_items)?;
        Ok(state.line_items.len() - 1)
    }

    /// Replaces the line item at `index`.
    pub fn update_line_item(&self, index: usize, input: LineItemInput) -> Result<(), ServiceError> {
        let mut state = self.editable()?;
        let current = state
            .line_items
            .get(index)
            .ok_or_else(|| line_out_of_range(index))?
            .clone();

        let item = LineItem::from_input(input)?;
        let name = if item.product_id == current.product_id {
            current.product_name.clone()
        } else {
            Some(
                state
                    .offered_product(&item.product_id)
                    .map(|p| p.name.clone())
                    .ok_or_else(|| not_offered(&item.product_id))?,
            )
        };

        let mut line_items = state.line_items.clone();
        line_items[index] = item.with_product_name(name);
        state.replace_line_items(line_items)?;
        Ok(())
    }

    pub fn remove_line_item(&self, index: usize) -> Result<LineItem, ServiceError> {
        let mut state = self.editable()?;
        if index >= state.line_items.len() {
            return Err(line_out_of_range(index));
        }
        let mut line_items = state.line_items.clone();
        let removed = line_items.remove(index);
        state.replace_line_items(line_items)?;
        Ok(removed)
    }

    /// Uploads a supporting document and records its handle on the draft.
    ///
    /// A failed upload leaves the existing documents untouched.
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name))]
    pub async fn attach_document(&self, upload: DocumentUpload) -> Result<Document, ServiceError> {
        drop(self.editable()?);

        let document = self
            .reference_data
            .gateway()
            .upload_document(upload)
            .await
            .map_err(|e| {
                error!("Document upload failed: {}", e);
                e
            })?;

        self.editable()?.documents.push(document.clone());
        Ok(document)
    }

    pub fn remove_document(&self, index: usize) -> Result<Document, ServiceError> {
        let mut state = self.editable()?;
        if index >= state.documents.len() {
            return Err(ServiceError::InvalidOperation(format!(
                "no document at position {}",
                index
            )));
        }
        Ok(state.documents.remove(index))
    }

    /// Validates and saves the draft, creating or updating as appropriate.
    ///
    /// Returns `Ok(None)` without doing anything when a submission is already
    /// in flight. On success the form is reset and closed. On failure it stays
    /// open with the operator's input intact.
    #[instrument(skip(self))]
    pub async fn submit(&self) -> Result<Option<FormEvent>, ServiceError> {
        if self.submitting.swap(true, Ordering::SeqCst) {
            debug!("Submit ignored: a submission is already in flight");
            return Ok(None);
        }
        let _guard = SubmitGuard { form: self };
        self.submit_draft().await.map(Some)
    }

    async fn submit_draft(&self) -> Result<FormEvent, ServiceError> {
        let payload = {
            let mut state = self.editable()?;
            let payload = state.build_payload()?;
            state.mode = FormMode::Submitting;
            payload
        };

        let result = match payload.id {
            Some(_) => self.repository.update(&payload).await,
            None => self.repository.create(&payload).await,
        };

        match result {
            Ok(ack) => {
                let id = ack.entity_id().or_else(|| payload.id.clone());
                info!(receipt_id = ?id, sub_total = %payload.sub_total, "Goods receipt saved");
                *self.lock() = FormState::default();
                Ok(FormEvent::Submitted { id })
            }
            Err(e) => {
                error!("Failed to save goods receipt: {}", e);
                Err(e)
            }
        }
    }

    /// Discards the draft and closes the form.
    pub fn cancel(&self) -> Result<FormEvent, ServiceError> {
        let mut state = self.lock();
        if state.mode == FormMode::Submitting {
            return Err(ServiceError::InvalidOperation(
                "cannot cancel while the receipt is being saved".to_string(),
            ));
        }
        *state = FormState::default();
        Ok(FormEvent::Cancelled)
    }
}

/// Clears the busy flag when a submission ends, including when the `submit`
/// future is dropped before completing. A form left in `Submitting` goes back
/// to `Ready` with the draft intact.
struct SubmitGuard<'a> {
    form: &'a ReceiptFormController,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        {
            let mut state = self.form.lock();
            if state.mode == FormMode::Submitting {
                state.mode = FormMode::Ready;
            }
        }
        self.form.submitting.store(false, Ordering::SeqCst);
    }
}

fn not_offered(product_id: &EntityId) -> ServiceError {
    ServiceError::InvalidOperation(format!(
        "product {} is not available for this receipt",
        product_id
    ))
}

fn line_out_of_range(index: usize) -> ServiceError {
    ServiceError::InvalidOperation(format!("no line item at position {}", index))
}
