use super::connector_trait::{Connection, Connector};
use crate::errors::AppError;
use crate::infrastructure::provider::WalletProvider;
use crate::log_info;
use crate::utils::parse_hex_quantity;
use async_trait::async_trait;
use ethers_core::types::Address;
use std::sync::Arc;

/// 节点托管账户（开发节点 / 已解锁账户）
pub struct RpcConnector {
    provider: Arc<dyn WalletProvider>,
}

impl RpcConnector {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Connector for RpcConnector {
    fn name(&self) -> &'static str {
        "rpc"
    }

    async fn connect(&self) -> Result<Connection, AppError> {
        let raw = self.provider.request("eth_accounts", vec![]).await?;
        let accounts: Vec<Address> = serde_json::from_value(raw)?;
        if accounts.is_empty() {
            return Err(AppError::WalletNotConnected("eth_accounts 返回空列表".to_string()));
        }

        let chain_id = parse_hex_quantity(&self.provider.request("eth_chainId", vec![]).await?)?;
        log_info!("[{}] 已连接 {} 个账户, chain_id={}", self.name(), accounts.len(), chain_id);
        Ok(Connection { accounts, chain_id })
    }

    fn provider(&self) -> Arc<dyn WalletProvider> {
        self.provider.clone()
    }
}
