pub mod contract_service;
pub mod signature;
pub mod tx;
pub mod wallet_service;

pub use contract_service::ContractService;
pub use wallet_service::WalletService;
