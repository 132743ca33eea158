pub mod config;
pub mod errors;
pub mod infrastructure;
pub mod services;
pub mod startup;
pub mod utils;

pub use errors::AppError;
pub use services::tx::{Outcome, TrackerOptions, TransactionHandle, TransactionRequest, TxResult};
