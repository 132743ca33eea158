use config::ConfigError;
use ethers_providers::ProviderError;
use thiserror::Error;

/// 钱包 RPC 中 "用户拒绝" 的标准错误码（EIP-1193）
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// 钱包未连接（没有可用账户）
    #[error("钱包未连接: {0}")]
    WalletNotConnected(String),

    /// 用户在钱包中拒绝了请求，不可重试
    #[error("用户拒绝请求: {0}")]
    UserRejected(String),

    #[error("RPC 调用失败: {0}")]
    ProviderError(String),

    #[error("无效的地址: {0}")]
    InvalidAddress(String),

    #[error("无效的数字: {0}")]
    InvalidNumber(String),

    #[error("类型转换错误: {0}")]
    Conversion(String),

    /// ABI 编码/解码失败
    #[error("ABI 编解码错误: {0}")]
    Encoding(String),

    #[error("签名错误: {0}")]
    Signature(String),

    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 内部不可预期错误（兜底）
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AppError {
    /// 钱包层面的拒绝不是瞬时错误，重试没有意义
    pub fn is_retriable(&self) -> bool {
        matches!(self, AppError::ProviderError(_))
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        use ethers_providers::RpcError;

        if let Some(resp) = err.as_error_response() {
            if resp.code == USER_REJECTED_CODE {
                return AppError::UserRejected(resp.message.clone());
            }
        }
        AppError::ProviderError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Conversion(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(err: std::num::ParseIntError) -> Self {
        AppError::InvalidNumber(err.to_string())
    }
}

impl From<hex::FromHexError> for AppError {
    fn from(err: hex::FromHexError) -> Self {
        AppError::Conversion(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_provider_errors_are_retriable() {
        assert!(AppError::ProviderError("timeout".into()).is_retriable());
        assert!(!AppError::UserRejected("denied".into()).is_retriable());
        assert!(!AppError::Validation("bad".into()).is_retriable());
    }

    #[test]
    fn transient_rpc_failures_read_as_rpc_errors() {
        let err = AppError::ProviderError("connection reset".into());
        assert_eq!(err.to_string(), "RPC 调用失败: connection reset");
    }
}
