// Goods receipt workflow
pub mod lifecycle;
pub mod receipt_detail;
pub mod receipt_form;
pub mod receipt_list;

// Option sets and purchase-order expansion for the form
pub mod reference_data;

pub use lifecycle::ReceiptActions;
pub use receipt_detail::{DetailEvent, DetailState, ReceiptDetailLoader};
pub use receipt_form::{FormEvent, FormMode, FormState, LineDefaults, ReceiptFormController};
pub use receipt_list::{ListEvent, ReceiptListController};
pub use reference_data::ReferenceDataLoader;
