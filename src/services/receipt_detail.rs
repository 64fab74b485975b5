use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{error, info, instrument, warn};

use crate::{
    errors::ServiceError,
    models::{EntityId, GoodsReceipt},
    repositories::GoodsReceiptRepository,
    services::lifecycle::{self, ReceiptActions},
};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DetailState {
    #[default]
    Idle,
    Loaded(Box<GoodsReceipt>),
    /// The view should close. Set after a failed load.
    Closed,
}

impl DetailState {
    pub fn receipt(&self) -> Option<&GoodsReceipt> {
        match self {
            Self::Loaded(receipt) => Some(receipt.as_ref()),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailEvent {
    OpenEditor(EntityId),
}

/// Read-only view of one receipt with approve and edit shortcuts.
pub struct ReceiptDetailLoader {
    repository: Arc<dyn GoodsReceiptRepository>,
    state: Mutex<DetailState>,
}

impl ReceiptDetailLoader {
    pub fn new(repository: Arc<dyn GoodsReceiptRepository>) -> Self {
        Self {
            repository,
            state: Mutex::new(DetailState::Idle),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DetailState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn state(&self) -> DetailState {
        self.lock().clone()
    }

    pub fn actions(&self) -> Option<ReceiptActions> {
        self.lock()
            .receipt()
            .map(|receipt| lifecycle::actions_for(receipt.status))
    }

    /// Fetches the receipt. Any failure, including an unknown id, moves the
    /// view to [`DetailState::Closed`] and returns the error for display.
    #[instrument(skip(self))]
    pub async fn load(&self, id: &EntityId) -> Result<GoodsReceipt, ServiceError> {
        let outcome = match self.repository.get_by_id(id).await {
            Ok(Some(receipt)) => Ok(receipt),
            Ok(None) => Err(ServiceError::NotFound(format!("Goods receipt {} not found", id))),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(receipt) => {
                *self.lock() = DetailState::Loaded(Box::new(receipt.clone()));
                Ok(receipt)
            }
            Err(e) => {
                error!("Failed to load goods receipt {}: {}", id, e);
                *self.lock() = DetailState::Closed;
                Err(e)
            }
        }
    }

    fn loaded(&self) -> Result<GoodsReceipt, ServiceError> {
        self.lock()
            .receipt()
            .cloned()
            .ok_or_else(|| ServiceError::InvalidOperation("no goods receipt is loaded".to_string()))
    }

    /// Approves the loaded draft and reloads it to show the status the backend chose.
    #[instrument(skip(self))]
    pub async fn approve(&self) -> Result<GoodsReceipt, ServiceError> {
        let current = self.loaded()?;
        lifecycle::ensure_approvable(current.status)?;

        self.repository.change_status(&current.id).await.map_err(|e| {
            error!("Failed to approve goods receipt {}: {}", current.display_code(), e);
            e
        })?;

        let reloaded = self.load(&current.id).await?;
        if !lifecycle::can_transition(current.status, reloaded.status) {
            warn!(
                from = %current.status,
                to = %reloaded.status,
                "Unexpected status after approving goods receipt {}",
                reloaded.display_code()
            );
        } else {
            info!(
                status = %reloaded.status,
                "Goods receipt {} approved",
                reloaded.display_code()
            );
        }
        Ok(reloaded)
    }

    /// Editor request for the loaded receipt. Only drafts can be edited.
    pub fn edit(&self) -> Result<DetailEvent, ServiceError> {
        let current = self.loaded()?;
        lifecycle::ensure_editable(current.status)?;
        Ok(DetailEvent::OpenEditor(current.id))
    }

    pub fn close(&self) {
        *self.lock() = DetailState::Closed;
    }
}
