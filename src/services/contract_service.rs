// services/contract_service.rs

use crate::errors::AppError;
use crate::services::tx::types::{Outcome, TrackerOptions, TransactionHandle, TxResult};
use crate::{log_info, log_warn};
use ethers_contract::Contract;
use ethers_core::abi::{Abi, Detokenize, Tokenize};
use ethers_core::types::{Address, TransactionReceipt, U64};
use ethers_providers::{JsonRpcClient, Middleware, PendingTransaction};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// 高层合约库路径：ethers-contract 负责编码、发送和等待回执。
///
/// `M` 决定谁来签名：节点托管账户用 `Provider<Http>`，
/// 本地私钥用 `SignerMiddleware<Provider<Http>, LocalWallet>`。
pub struct ContractService<M> {
    contract: Contract<M>,
    options: TrackerOptions,
    legacy: bool,
}

impl<M: Middleware + 'static> ContractService<M> {
    pub fn new(address: Address, abi: Abi, client: Arc<M>, options: TrackerOptions) -> Self {
        Self {
            contract: Contract::new(address, abi, client),
            options,
            legacy: false,
        }
    }

    /// 发送 legacy 交易而不是 EIP-1559 交易
    pub fn with_legacy(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    /// 只读调用，返回值由合约库解码
    pub async fn read<T: Tokenize, R: Detokenize>(
        &self,
        function: &str,
        args: T,
    ) -> Result<R, AppError> {
        self.contract
            .method::<T, R>(function, args)
            .map_err(|e| AppError::Encoding(format!("{}: {}", function, e)))?
            .call()
            .await
            .map_err(|e| AppError::ProviderError(format!("{} 调用失败: {}", function, e)))
    }

    /// 发送交易并等待确认，结果与原始 RPC 路径一样分类
    pub async fn send<T: Tokenize>(
        &self,
        from: Address,
        function: &str,
        args: T,
        cancel: &CancellationToken,
    ) -> Result<TxResult, AppError> {
        let mut call = self
            .contract
            .method::<T, ()>(function, args)
            .map_err(|e| AppError::Encoding(format!("{}: {}", function, e)))?
            .from(from);
        if self.legacy {
            call = call.legacy();
        }

        let pending = match call.send().await {
            Ok(pending) => pending,
            Err(e) => {
                log_warn!("合约交易 {} 提交失败: {}", function, e);
                return Ok(TxResult {
                    handle: None,
                    outcome: Outcome::SubmissionError(e.to_string()),
                });
            }
        };
        log_info!("合约交易已提交: {}.{} -> {:#x}", self.address(), function, pending.tx_hash());

        Ok(self.track(pending, cancel).await)
    }

    /// 等待已提交的交易，受同一组超时和取消约束
    async fn track<P: JsonRpcClient>(
        &self,
        pending: PendingTransaction<'_, P>,
        cancel: &CancellationToken,
    ) -> TxResult {
        let handle = TransactionHandle(format!("{:#x}", pending.tx_hash()));
        let interval = self.options.poll_interval();
        let pending = pending
            .interval(interval)
            .confirmations(self.options.required_confirmations() as usize);
        let budget = self.wait_budget();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Outcome::Cancelled,
            waited = tokio::time::timeout(budget, pending) => match waited {
                Ok(Ok(Some(receipt))) => classify_receipt(&receipt),
                Ok(Ok(None)) => Outcome::PollingError("交易已从内存池中丢弃".to_string()),
                Ok(Err(e)) => Outcome::PollingError(e.to_string()),
                Err(_) => Outcome::TimedOut {
                    attempts: estimated_polls(budget, interval),
                },
            },
        };
        log_info!("合约交易 {}: {}", handle, outcome);

        TxResult {
            handle: Some(handle),
            outcome,
        }
    }

    /// 没有配置墙钟超时时，用 轮询间隔 × 次数 作为上限
    fn wait_budget(&self) -> Duration {
        self.options
            .timeout()
            .unwrap_or_else(|| self.options.poll_interval() * self.options.attempt_budget())
    }
}

/// 合约库不暴露查询次数，按 等待时长 / 轮询间隔 估算
fn estimated_polls(waited: Duration, interval: Duration) -> u32 {
    let polls = waited.as_millis() / interval.as_millis().max(1);
    u32::try_from(polls).unwrap_or(u32::MAX).max(1)
}

/// status == 1 才算成功
pub fn classify_receipt(receipt: &TransactionReceipt) -> Outcome {
    let block_number = receipt.block_number.unwrap_or_default().as_u64();
    if receipt.status == Some(U64::from(1)) {
        Outcome::Confirmed { block_number }
    } else {
        Outcome::Failed { block_number }
    }
}
