use serde::Serialize;

/// Field-level problems found in a receipt draft before anything reaches the network.
///
/// Each variant renders the message shown to the operator, so the text names the
/// field that needs attention.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum DraftIssue {
    #[error("Please select a purchase order")]
    MissingPurchaseOrder,

    #[error("Please select a warehouse")]
    MissingWarehouse,

    #[error("Please select a supplier")]
    MissingSupplier,

    #[error("Please add at least one product")]
    NoLineItems,

    #[error("Please select a product")]
    MissingProduct,

    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    #[error("Stack number must be greater than zero")]
    InvalidStack,

    #[error("Unit price cannot be negative")]
    NegativeUnitPrice,

    #[error("Handling fee cannot be negative")]
    NegativeFee,

    #[error("Line total is too large")]
    LineTotalTooLarge,

    #[error("Receipt subtotal is too large")]
    SubTotalTooLarge,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("{0}")]
    Draft(#[from] DraftIssue),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend or network failure. The message is the backend's own text when it
    /// sent one.
    #[error("{0}")]
    ExternalApiError(String),

    #[error("Unexpected response shape: {0}")]
    ShapeError(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::ExternalApiError(err.to_string())
    }
}

impl From<config::ConfigError> for ServiceError {
    fn from(err: config::ConfigError) -> Self {
        ServiceError::ConfigError(err.to_string())
    }
}

impl ServiceError {
    /// True for failures detected locally, before any request was sent.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Draft(_)
                | Self::ValidationError(_)
                | Self::InvalidStatus(_)
                | Self::InvalidOperation(_)
        )
    }

    /// Message suitable for the blocking notification shown to the operator.
    pub fn user_message(&self) -> String {
        match self {
            Self::Draft(issue) => issue.to_string(),
            Self::ExternalApiError(msg) => msg.clone(),
            Self::SerializationError(_) | Self::ShapeError(_) | Self::Other(_) => {
                "The server returned data that could not be read".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Notification text naming the action that failed, e.g. `"Approve failed: ..."`.
    pub fn notification(&self, action: &str) -> String {
        format!("{} failed: {}", action, self.user_message())
    }
}
