use super::wallet_provider::WalletProvider;
use crate::config::WalletConfig;
use crate::errors::AppError;
use crate::log_debug;
use async_trait::async_trait;
use ethers_providers::{Http, Provider};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// 直接转发到 JSON-RPC 节点的 provider
pub struct RpcWalletProvider {
    provider: Arc<Provider<Http>>,
}

impl RpcWalletProvider {
    pub fn new(config: &WalletConfig) -> Result<Self, AppError> {
        let url = Url::parse(&config.rpc_url)
            .map_err(|e| AppError::Validation(format!("无效的 RPC URL {}: {}", config.rpc_url, e)))?;
        let provider = Provider::<Http>::try_from(url.as_str())
            .map_err(|e| AppError::Validation(format!("无效的 RPC URL {}: {}", url, e)))?;
        Ok(Self { provider: Arc::new(provider) })
    }

    /// 给高层合约库（ethers-contract）复用同一个 HTTP 客户端
    pub fn inner(&self) -> Arc<Provider<Http>> {
        self.provider.clone()
    }
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, AppError> {
        log_debug!("RPC -> {} {:?}", method, params);
        let result: Value = self
            .provider
            .request(method, params)
            .await
            .map_err(AppError::from)?;
        Ok(result)
    }
}
