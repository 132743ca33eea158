// services/tx/tracker.rs
//
// 提交交易并轮询回执直到终态：
// Submitting -> (SubmissionError | Polling)
// Polling -> (Polling | Confirmed | Failed | TimedOut | Cancelled | PollingError)

use crate::errors::AppError;
use crate::infrastructure::provider::WalletProvider;
use crate::services::tx::types::{
    Outcome, ReceiptStatus, ReceiptSummary, TrackerOptions, TransactionHandle, TransactionRequest,
    TxResult,
};
use crate::utils::parse_hex_quantity;
use crate::{log_debug, log_info, log_warn};
use serde_json::{Value, json};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

/// 提交 + 等待确认，总是返回一个终态结果
pub async fn submit_and_confirm(
    request: &TransactionRequest,
    provider: &dyn WalletProvider,
    options: &TrackerOptions,
    cancel: &CancellationToken,
) -> TxResult {
    let handle = match submit(request, provider).await {
        Ok(handle) => handle,
        Err(e) => {
            log_warn!("交易提交失败: {}", e);
            return TxResult {
                handle: None,
                outcome: Outcome::SubmissionError(e.to_string()),
            };
        }
    };

    let outcome = wait_for_receipt(&handle, provider, options, cancel).await;
    TxResult {
        handle: Some(handle),
        outcome,
    }
}

/// eth_sendTransaction，失败不重试
pub async fn submit(
    request: &TransactionRequest,
    provider: &dyn WalletProvider,
) -> Result<TransactionHandle, AppError> {
    let result = provider
        .request("eth_sendTransaction", vec![request.to_param()?])
        .await?;

    match result {
        Value::String(hash) if !hash.is_empty() => {
            log_info!("交易已提交: {} ({:?} -> {:?})", hash, request.from, request.to);
            Ok(TransactionHandle(hash))
        }
        other => Err(AppError::ProviderError(format!(
            "eth_sendTransaction 返回了非法的交易哈希: {}",
            other
        ))),
    }
}

#[derive(Clone, Copy)]
enum Phase {
    AwaitingReceipt,
    /// 已成功打包，等待区块深度达到所需确认数
    AwaitingDepth { block_number: u64 },
}

/// 轮询回执。第一次立即查询，之后每次查询间隔 poll_interval。
pub async fn wait_for_receipt(
    handle: &TransactionHandle,
    provider: &dyn WalletProvider,
    options: &TrackerOptions,
    cancel: &CancellationToken,
) -> Outcome {
    let budget = options.attempt_budget();
    let confirmations = options.required_confirmations();
    let deadline = options.timeout().map(|t| Instant::now() + t);

    let mut phase = Phase::AwaitingReceipt;
    let mut last_error: Option<AppError> = None;
    let mut attempts = 0u32;

    while attempts < budget {
        if cancel.is_cancelled() {
            log_info!("交易 {} 的轮询已取消 (第 {} 次查询前)", handle, attempts + 1);
            return Outcome::Cancelled;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        attempts += 1;
        let poll = async {
            match phase {
                Phase::AwaitingReceipt => poll_receipt(handle, provider).await,
                Phase::AwaitingDepth { block_number } => {
                    poll_depth(provider, block_number, confirmations).await
                }
            }
        };
        // 进行中的请求同样受取消和截止时间约束
        let step = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log_info!("交易 {} 的轮询已取消 (第 {} 次查询进行中)", handle, attempts);
                return Outcome::Cancelled;
            }
            step = within_deadline(poll, deadline) => step,
        };
        let Some(step) = step else {
            log_warn!("交易 {} 的第 {} 次查询超过截止时间", handle, attempts);
            break;
        };

        match step {
            Ok(Some(Poll::Done(outcome))) => {
                log_info!("交易 {}: {}", handle, outcome);
                return outcome;
            }
            Ok(Some(Poll::Mined(block_number))) if confirmations > 1 => {
                log_debug!("交易 {} 已打包于区块 {}，等待 {} 个确认", handle, block_number, confirmations);
                phase = Phase::AwaitingDepth { block_number };
                last_error = None;
            }
            Ok(Some(Poll::Mined(block_number))) => {
                log_info!("交易 {} 已确认，区块 {}", handle, block_number);
                return Outcome::Confirmed { block_number };
            }
            Ok(None) => {
                log_debug!("交易 {} 等待中 (第 {}/{} 次查询)", handle, attempts, budget);
                last_error = None;
            }
            Err(e) => {
                log_warn!("查询交易 {} 失败 (第 {}/{} 次): {}", handle, attempts, budget, e);
                last_error = Some(e);
            }
        }

        if attempts == budget {
            break;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log_info!("交易 {} 的轮询已取消", handle);
                return Outcome::Cancelled;
            }
            _ = sleep_until_next(options, deadline) => {}
        }
    }

    match last_error {
        Some(e) => {
            log_warn!("交易 {} 轮询失败，放弃: {}", handle, e);
            Outcome::PollingError(e.to_string())
        }
        None => {
            log_warn!("交易 {} 在 {} 次查询后仍未打包，停止轮询", handle, attempts);
            Outcome::TimedOut { attempts }
        }
    }
}

enum Poll {
    /// status == 1，块号已解码
    Mined(u64),
    Done(Outcome),
}

async fn poll_receipt(
    handle: &TransactionHandle,
    provider: &dyn WalletProvider,
) -> Result<Option<Poll>, AppError> {
    let raw = provider
        .request("eth_getTransactionReceipt", vec![json!(handle)])
        .await?;
    if raw.is_null() {
        return Ok(None);
    }

    let receipt = ReceiptSummary::from_value(raw)?;
    Ok(Some(match receipt.status {
        ReceiptStatus::Success => Poll::Mined(receipt.block_number),
        ReceiptStatus::Failure => Poll::Done(Outcome::Failed {
            block_number: receipt.block_number,
        }),
    }))
}

async fn poll_depth(
    provider: &dyn WalletProvider,
    block_number: u64,
    confirmations: u64,
) -> Result<Option<Poll>, AppError> {
    let head = parse_hex_quantity(&provider.request("eth_blockNumber", vec![]).await?)?;
    if head.saturating_sub(block_number) + 1 >= confirmations {
        Ok(Some(Poll::Done(Outcome::Confirmed { block_number })))
    } else {
        Ok(None)
    }
}

/// 截止时间到达时返回 None
async fn within_deadline<F: Future>(fut: F, deadline: Option<Instant>) -> Option<F::Output> {
    match deadline {
        Some(d) => tokio::time::timeout_at(d, fut).await.ok(),
        None => Some(fut.await),
    }
}

/// 不会睡过 deadline
async fn sleep_until_next(options: &TrackerOptions, deadline: Option<Instant>) {
    let wake = Instant::now() + options.poll_interval();
    match deadline {
        Some(d) if d < wake => tokio::time::sleep_until(d).await,
        _ => sleep(options.poll_interval()).await,
    }
}
