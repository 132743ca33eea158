use crate::errors::AppError;
use async_trait::async_trait;
use serde_json::Value;

/// 注入式钱包的 RPC 能力：request(method, params) -> result
///
/// 用户拒绝应返回 `AppError::UserRejected`，网络/节点故障返回 `AppError::ProviderError`。
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, AppError>;
}

/// 只读、幂等的方法，失败后可以安全重试
pub fn is_idempotent(method: &str) -> bool {
    matches!(
        method,
        "eth_getTransactionReceipt"
            | "eth_getBalance"
            | "eth_call"
            | "eth_blockNumber"
            | "eth_chainId"
            | "eth_accounts"
            | "eth_getTransactionCount"
            | "eth_gasPrice"
            | "eth_estimateGas"
    )
}
