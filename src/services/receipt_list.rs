use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use crate::{
    debounce::Debouncer,
    errors::ServiceError,
    models::{EntityId, ReceiptSummary},
    repositories::GoodsReceiptRepository,
    services::lifecycle::{self, ReceiptActions},
};

/// Navigation requested by the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    OpenEditor(EntityId),
    OpenDetail(EntityId),
}

#[derive(Debug, Default)]
struct ListState {
    receipts: Vec<ReceiptSummary>,
    keyword: String,
    expanded: Option<EntityId>,
}

/// Receipt list with debounced keyword search, row expansion and approval.
///
/// Whichever load or search completes last decides the visible rows.
pub struct ReceiptListController {
    repository: Arc<dyn GoodsReceiptRepository>,
    state: Mutex<ListState>,
    debouncer: Debouncer,
}

impl ReceiptListController {
    pub fn new(repository: Arc<dyn GoodsReceiptRepository>, search_debounce: Duration) -> Arc<Self> {
        Arc::new(Self {
            repository,
            state: Mutex::new(ListState::default()),
            debouncer: Debouncer::new(search_debounce),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ListState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn receipts(&self) -> Vec<ReceiptSummary> {
        self.lock().receipts.clone()
    }

    pub fn keyword(&self) -> String {
        self.lock().keyword.clone()
    }

    pub fn expanded(&self) -> Option<EntityId> {
        self.lock().expanded.clone()
    }

    fn find(&self, id: &EntityId) -> Result<ReceiptSummary, ServiceError> {
        self.lock()
            .receipts
            .iter()
            .find(|r| &r.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("Goods receipt {} is not in the list", id)))
    }

    /// Actions for a listed receipt, `None` if the row is not present.
    pub fn actions(&self, id: &EntityId) -> Option<ReceiptActions> {
        self.find(id).ok().map(|r| lifecycle::actions_for(r.status))
    }

    fn replace(&self, outcome: Result<Vec<ReceiptSummary>, ServiceError>) -> Result<usize, ServiceError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        match outcome {
            Ok(receipts) => {
                let count = receipts.len();
                if let Some(expanded) = &state.expanded {
                    if !receipts.iter().any(|r| &r.id == expanded) {
                        state.expanded = None;
                    }
                }
                state.receipts = receipts;
                Ok(count)
            }
            Err(e) => {
                state.receipts.clear();
                state.expanded = None;
                Err(e)
            }
        }
    }

    /// Loads the unfiltered first page. On failure the list is emptied.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<usize, ServiceError> {
        let outcome = self.repository.list().await;
        if let Err(e) = &outcome {
            error!("Failed to load goods receipts: {}", e);
        }
        self.replace(outcome)
    }

    /// Searches by keyword. On failure the list is emptied.
    #[instrument(skip(self))]
    pub async fn search(&self, keyword: &str) -> Result<usize, ServiceError> {
        let outcome = self.repository.search(keyword).await;
        if let Err(e) = &outcome {
            error!("Failed to search goods receipts for '{}': {}", keyword, e);
        }
        self.replace(outcome)
    }

    /// Search when `keyword` has text, otherwise the unfiltered list.
    pub async fn refresh(&self, keyword: &str) -> Result<usize, ServiceError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            self.load().await
        } else {
            self.search(keyword).await
        }
    }

    /// Records the keyword and refreshes once the debounce window passes
    /// without another keystroke.
    pub fn set_search_keyword(self: &Arc<Self>, keyword: impl Into<String>) {
        let keyword = keyword.into();
        self.lock().keyword = keyword.clone();

        let this = Arc::clone(self);
        self.debouncer.schedule(async move {
            if let Err(e) = this.refresh(&keyword).await {
                warn!("Debounced refresh for '{}' failed: {}", keyword, e);
            }
        });
    }

    /// Expands `id`, or collapses it when it is already the expanded row.
    pub fn toggle_expand(&self, id: &EntityId) -> Option<EntityId> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.expanded = match &state.expanded {
            Some(current) if current == id => None,
            _ => Some(id.clone()),
        };
        state.expanded.clone()
    }

    /// Approves a listed draft, then reloads the unfiltered list.
    #[instrument(skip(self))]
    pub async fn approve(&self, id: &EntityId) -> Result<(), ServiceError> {
        let receipt = self.find(id)?;
        lifecycle::ensure_approvable(receipt.status)?;

        self.repository.change_status(id).await.map_err(|e| {
            error!("Failed to approve goods receipt {}: {}", receipt.display_code(), e);
            e
        })?;
        info!("Goods receipt {} approved", receipt.display_code());

        self.load().await?;
        Ok(())
    }

    pub fn request_edit(&self, id: &EntityId) -> Result<ListEvent, ServiceError> {
        let receipt = self.find(id)?;
        lifecycle::ensure_editable(receipt.status)?;
        Ok(ListEvent::OpenEditor(receipt.id))
    }

    pub fn request_view(&self, id: &EntityId) -> Result<ListEvent, ServiceError> {
        Ok(ListEvent::OpenDetail(self.find(id)?.id))
    }
}
