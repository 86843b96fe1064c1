//! Transaction Validation
//!
//! Schema checks for incoming card transactions: presence and numeric type
//! of every required field, for single JSON payloads and CSV batches.

mod batch;
mod error;
mod transaction;
mod validator;

pub use batch::CsvBatchReader;
pub use error::ValidationError;
pub use transaction::{Transaction, V_FEATURE_COUNT, V_FIELDS};
pub use validator::{TransactionValidator, ValidationConfig};
