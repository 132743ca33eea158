use crate::errors::AppError;
use crate::infrastructure::provider::WalletProvider;
use async_trait::async_trait;
use ethers_core::types::Address;
use std::sync::Arc;

/// connect() 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub accounts: Vec<Address>,
    pub chain_id: u64,
}

impl Connection {
    /// accounts[0]
    pub fn account(&self) -> Result<Address, AppError> {
        self.accounts
            .first()
            .copied()
            .ok_or_else(|| AppError::WalletNotConnected("钱包没有可用账户".to_string()))
    }
}

/// 不同钱包接入方式的统一能力
#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &'static str;
    async fn connect(&self) -> Result<Connection, AppError>;
    fn provider(&self) -> Arc<dyn WalletProvider>;
}
