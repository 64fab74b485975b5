//! Status rules for goods receipts.
//!
//! Only drafts can be edited or approved. Approval is decided by the backend,
//! which moves a draft to one of the terminal statuses.

use serde::Serialize;

use crate::{errors::ServiceError, models::GoodsReceiptStatus};

use GoodsReceiptStatus::*;

/// Row or detail actions available for a receipt in a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReceiptActions {
    pub view: bool,
    pub edit: bool,
    pub approve: bool,
}

pub fn can_edit(status: GoodsReceiptStatus) -> bool {
    status == Draft
}

pub fn can_approve(status: GoodsReceiptStatus) -> bool {
    status == Draft
}

/// Statuses a receipt may move to from `status`.
pub fn successors(status: GoodsReceiptStatus) -> &'static [GoodsReceiptStatus] {
    match status {
        Draft => &[Received, Partial, Cancelled],
        Received | Partial | PartialCompleted | Cancelled => &[],
    }
}

pub fn can_transition(from: GoodsReceiptStatus, to: GoodsReceiptStatus) -> bool {
    successors(from).contains(&to)
}

pub fn is_terminal(status: GoodsReceiptStatus) -> bool {
    successors(status).is_empty()
}

pub fn actions_for(status: GoodsReceiptStatus) -> ReceiptActions {
    ReceiptActions {
        view: true,
        edit: can_edit(status),
        approve: can_approve(status),
    }
}

pub fn ensure_editable(status: GoodsReceiptStatus) -> Result<(), ServiceError> {
    if can_edit(status) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "a {} receipt can no longer be edited",
            status.label().to_lowercase()
        )))
    }
}

pub fn ensure_approvable(status: GoodsReceiptStatus) -> Result<(), ServiceError> {
    if can_approve(status) {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "only draft receipts can be approved, this one is {}",
            status
        )))
    }
}
