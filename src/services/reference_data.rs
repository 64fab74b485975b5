use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::{
    errors::ServiceError,
    models::{EntityId, Product, PurchaseOrderDetail, ReferenceOptions},
    repositories::PurchaseOrderGateway,
};

/// Loads the option sets and purchase-order details the receipt form works from.
#[derive(Clone)]
pub struct ReferenceDataLoader {
    gateway: Arc<dyn PurchaseOrderGateway>,
}

impl ReferenceDataLoader {
    pub fn new(gateway: Arc<dyn PurchaseOrderGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<dyn PurchaseOrderGateway> {
        &self.gateway
    }

    /// Fetches orders, warehouses, suppliers and products concurrently.
    ///
    /// Fails as a whole if any single fetch fails.
    #[instrument(skip(self))]
    pub async fn load_options(&self) -> Result<ReferenceOptions, ServiceError> {
        let (purchase_orders, warehouses, suppliers, products) = futures::try_join!(
            self.gateway.list_orders(),
            self.gateway.list_warehouses(),
            self.gateway.list_suppliers(),
            self.gateway.list_products(),
        )
        .map_err(|e| {
            error!("Failed to load receipt reference data: {}", e);
            e
        })?;

        info!(
            purchase_orders = purchase_orders.len(),
            warehouses = warehouses.len(),
            suppliers = suppliers.len(),
            products = products.len(),
            "Loaded receipt reference data"
        );

        Ok(ReferenceOptions {
            purchase_orders,
            warehouses,
            suppliers,
            products,
        })
    }

    /// Expanded purchase order, or `Ok(None)` when no order is selected.
    ///
    /// A selected order the backend does not know is `NotFound`.
    #[instrument(skip(self))]
    pub async fn load_purchase_order_detail(
        &self,
        purchase_order_id: Option<&EntityId>,
    ) -> Result<Option<PurchaseOrderDetail>, ServiceError> {
        let Some(id) = purchase_order_id.filter(|id| !id.is_blank()) else {
            return Ok(None);
        };

        match self.gateway.get_order_by_id(id).await? {
            Some(detail) => Ok(Some(detail)),
            None => {
                error!("Purchase order {} not found", id);
                Err(ServiceError::NotFound(format!("Purchase order {} not found", id)))
            }
        }
    }
}

/// Products a receipt may contain given the selected order.
///
/// With no order, or an order without lines, the whole catalog is offered.
/// Otherwise exactly the ordered products are offered, in catalog order, with
/// ordered products missing from the catalog appended from the order lines.
pub fn products_for_order(order: Option<&PurchaseOrderDetail>, catalog: &[Product]) -> Vec<Product> {
    let Some(order) = order.filter(|o| !o.products.is_empty()) else {
        return catalog.to_vec();
    };

    let ordered: HashSet<&EntityId> = order.products.iter().map(|line| &line.product_id).collect();
    let mut offered: Vec<Product> = catalog
        .iter()
        .filter(|product| ordered.contains(&product.id))
        .cloned()
        .collect();

    let mut seen: HashSet<EntityId> = offered.iter().map(|p| p.id.clone()).collect();
    for line in &order.products {
        if seen.insert(line.product_id.clone()) {
            offered.push(Product {
                id: line.product_id.clone(),
                name: line
                    .product_name
                    .clone()
                    .unwrap_or_else(|| line.product_id.to_string()),
                code: None,
                cost: Some(line.unit_price),
            });
        }
    }
    offered
}
