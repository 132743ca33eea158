// services/tx/types.rs

use crate::errors::AppError;
use crate::utils::parse_hex_quantity;
use ethers_core::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// 轮询参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerOptions {
    pub poll_interval_ms: u64,
    /// 最多发起的回执查询次数（含确认数等待）
    pub max_attempts: u32,
    /// 可选的墙钟超时，与 max_attempts 先到者为准
    pub timeout_ms: Option<u64>,
    /// 所需确认数，1 表示打包即最终
    pub confirmations: u64,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        // 150 × 2s ≈ 5 分钟
        Self {
            poll_interval_ms: 2000,
            max_attempts: 150,
            timeout_ms: None,
            confirmations: 1,
        }
    }
}

impl TrackerOptions {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// 至少查询一次
    pub fn attempt_budget(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn required_confirmations(&self) -> u64 {
        self.confirmations.max(1)
    }
}

/// eth_sendTransaction 的参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
}

impl TransactionRequest {
    /// 原生币转账
    pub fn transfer(from: Address, to: Address, value: U256) -> Self {
        Self { from, to, value: Some(value), data: None }
    }

    /// 合约调用（value 为空）
    pub fn contract_call(from: Address, to: Address, data: Bytes) -> Self {
        Self { from, to, value: None, data: Some(data) }
    }

    pub fn to_param(&self) -> Result<Value, AppError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// 提交后立即返回的交易标识（hash）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionHandle(pub String);

impl TransactionHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Failure,
}

/// 回执中本模块关心的字段，其余原样保留在 raw
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptSummary {
    pub status: ReceiptStatus,
    pub block_number: u64,
    pub transaction_hash: Option<String>,
    pub raw: Value,
}

impl ReceiptSummary {
    /// 只有 status == 1 才算成功；缺失或其他值一律视为失败
    pub fn from_value(raw: Value) -> Result<Self, AppError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| AppError::Conversion(format!("回执格式错误: {}", raw)))?;

        let block_number = obj
            .get("blockNumber")
            .filter(|v| !v.is_null())
            .ok_or_else(|| AppError::Conversion("回执缺少 blockNumber".to_string()))
            .and_then(parse_hex_quantity)?;

        let status = match obj.get("status").map(parse_hex_quantity) {
            Some(Ok(1)) => ReceiptStatus::Success,
            _ => ReceiptStatus::Failure,
        };

        let transaction_hash = obj
            .get("transactionHash")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self { status, block_number, transaction_hash, raw })
    }
}

/// 终态结果；每次调用只会产生一个
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Confirmed { block_number: u64 },
    /// 已打包但执行失败（revert）
    Failed { block_number: u64 },
    /// 预算耗尽仍未打包，交易之后仍可能上链。
    /// attempts 为已发起的查询次数；合约库路径按 等待时长 / 轮询间隔 估算
    TimedOut { attempts: u32 },
    Cancelled,
    /// 钱包/节点拒绝了提交，不可重试
    SubmissionError(String),
    /// 预算耗尽且最后一次查询失败
    PollingError(String),
}

impl Outcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Outcome::Confirmed { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Confirmed { block_number } => write!(f, "confirmed in block {}", block_number),
            Outcome::Failed { block_number } => write!(f, "reverted in block {}", block_number),
            Outcome::TimedOut { attempts } => write!(f, "not mined after {} polls", attempts),
            Outcome::Cancelled => write!(f, "cancelled"),
            Outcome::SubmissionError(reason) => write!(f, "submission rejected: {}", reason),
            Outcome::PollingError(reason) => write!(f, "polling failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TxResult {
    /// 仅在 SubmissionError 时为空
    pub handle: Option<TransactionHandle>,
    pub outcome: Outcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transfer_serializes_without_data() {
        let from: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let to: Address = "0x00000000000000000000000000000000000000bb".parse().unwrap();
        let param = TransactionRequest::transfer(from, to, U256::from(16)).to_param().unwrap();

        assert_eq!(param["from"], json!("0x00000000000000000000000000000000000000aa"));
        assert_eq!(param["value"], json!("0x10"));
        assert!(param.get("data").is_none());
    }

    #[test]
    fn receipt_status_is_binary() {
        let ok = ReceiptSummary::from_value(json!({"status": "0x1", "blockNumber": "0x2a"})).unwrap();
        assert_eq!(ok.status, ReceiptStatus::Success);
        assert_eq!(ok.block_number, 42);

        for status in [json!("0x0"), json!("0x2"), Value::Null] {
            let r = ReceiptSummary::from_value(json!({"status": status, "blockNumber": "0x1"})).unwrap();
            assert_eq!(r.status, ReceiptStatus::Failure);
        }

        let missing = ReceiptSummary::from_value(json!({"blockNumber": "0x1"})).unwrap();
        assert_eq!(missing.status, ReceiptStatus::Failure);
    }

    #[test]
    fn receipt_without_block_is_malformed() {
        assert!(ReceiptSummary::from_value(json!({"status": "0x1"})).is_err());
        assert!(ReceiptSummary::from_value(json!("0x1")).is_err());
    }
}
