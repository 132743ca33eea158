pub mod encoder;
pub mod tracker;
pub mod types;

pub use encoder::{AbiEncoder, TransactionEncoder};
pub use tracker::{submit, submit_and_confirm, wait_for_receipt};
pub use types::{Outcome, TrackerOptions, TransactionHandle, TransactionRequest, TxResult};
