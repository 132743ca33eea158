pub mod retry_adapter;
pub mod rpc_provider;
pub mod wallet_provider;

pub use retry_adapter::RetryAdapter;
pub use rpc_provider::RpcWalletProvider;
pub use wallet_provider::WalletProvider;
