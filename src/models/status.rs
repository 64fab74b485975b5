use serde::{Deserialize, Serialize};

/// Lifecycle status of a goods receipt as stored by the backend.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GoodsReceiptStatus {
    #[default]
    Draft,
    Received,
    Partial,
    PartialCompleted,
    Cancelled,
}

impl GoodsReceiptStatus {
    /// Human readable label for list and detail views.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Received => "Received",
            Self::Partial => "Partially received",
            Self::PartialCompleted => "Partial, completed",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Self::Draft)
    }
}
