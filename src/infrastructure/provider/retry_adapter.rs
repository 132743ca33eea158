use super::wallet_provider::{WalletProvider, is_idempotent};
use crate::errors::AppError;
use crate::log_warn;
use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// 对幂等的只读方法做指数退避重试。
/// 提交/签名类请求以及用户拒绝直接透传，不重试。
pub struct RetryAdapter {
    inner: Arc<dyn WalletProvider>,
    max_retries: usize,
    base_delay: Duration,
}

impl RetryAdapter {
    pub fn new(inner: Arc<dyn WalletProvider>, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries: max_retries.max(1),
            base_delay,
        }
    }

    /// base * 2^n，n 最高 10，外加 0~10% 抖动，避免多个任务同时打到节点
    fn backoff(&self, attempt: usize) -> Duration {
        let exponent = (attempt - 1).min(10) as u32;
        let delay_ms = (self.base_delay.as_millis() as u64).saturating_mul(1u64 << exponent);
        let jitter = rand::thread_rng().gen_range(0..=(delay_ms / 10 + 1));
        Duration::from_millis(delay_ms + jitter)
    }
}

#[async_trait]
impl WalletProvider for RetryAdapter {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, AppError> {
        if !is_idempotent(method) {
            return self.inner.request(method, params).await;
        }

        let mut last_error = None;
        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                log_warn!("{} 第 {} 次重试，等待 {:?}...", method, attempt + 1, delay);
                sleep(delay).await;
            }
            match self.inner.request(method, params.clone()).await {
                Ok(result) => return Ok(result),
                Err(e) if !e.is_retriable() => return Err(e),
                Err(e) => {
                    log_warn!("{} 调用失败 (第 {} 次): {}", method, attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }
        Err(AppError::ProviderError(format!(
            "{} 重试 {} 次失败，最后错误: {}",
            method,
            self.max_retries,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 前 fail_times 次返回网络错误
    struct Flaky {
        calls: AtomicUsize,
        fail_times: usize,
        error: Mutex<Option<AppError>>,
    }

    impl Flaky {
        fn new(fail_times: usize) -> Self {
            Self { calls: AtomicUsize::new(0), fail_times, error: Mutex::new(None) }
        }
    }

    #[async_trait]
    impl WalletProvider for Flaky {
        async fn request(&self, _method: &str, _params: Vec<Value>) -> Result<Value, AppError> {
            if let Some(e) = self.error.lock().unwrap().take() {
                return Err(e);
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                Err(AppError::ProviderError("connection reset".into()))
            } else {
                Ok(Value::from("0x1"))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_reads_until_success() {
        let inner = Arc::new(Flaky::new(2));
        let adapter = RetryAdapter::new(inner.clone(), 5, Duration::from_millis(100));

        let result = adapter.request("eth_blockNumber", vec![]).await.unwrap();
        assert_eq!(result, Value::from("0x1"));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let inner = Arc::new(Flaky::new(10));
        let adapter = RetryAdapter::new(inner.clone(), 3, Duration::from_millis(100));

        let err = adapter.request("eth_getBalance", vec![]).await.unwrap_err();
        assert!(matches!(err, AppError::ProviderError(_)));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn never_retries_submission() {
        let inner = Arc::new(Flaky::new(1));
        let adapter = RetryAdapter::new(inner.clone(), 5, Duration::from_millis(100));

        assert!(adapter.request("eth_sendTransaction", vec![]).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn user_rejection_is_not_retried() {
        let inner = Arc::new(Flaky::new(0));
        *inner.error.lock().unwrap() = Some(AppError::UserRejected("denied".into()));
        let adapter = RetryAdapter::new(inner.clone(), 5, Duration::from_millis(100));

        let err = adapter.request("eth_accounts", vec![]).await.unwrap_err();
        assert!(matches!(err, AppError::UserRejected(_)));
    }
}
