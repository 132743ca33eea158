#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use wallet_tx_tracker::AppError;
use wallet_tx_tracker::infrastructure::provider::WalletProvider;

pub type Reply = Result<Value, AppError>;

/// 按方法名脚本化应答的 provider，记录每一次请求及其时间
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    fallback: Mutex<HashMap<String, Value>>,
    pub calls: Mutex<Vec<Call>>,
    /// 第 n 次收据查询时触发取消
    cancel_on_receipt_poll: Mutex<Option<(usize, CancellationToken)>>,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub method: String,
    pub params: Vec<Value>,
    pub at: Instant,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, method: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// 脚本耗尽后的默认应答
    pub fn always(self, method: &str, value: Value) -> Self {
        self.fallback.lock().unwrap().insert(method.to_string(), value);
        self
    }

    pub fn cancel_on_receipt_poll(self, n: usize, token: CancellationToken) -> Self {
        *self.cancel_on_receipt_poll.lock().unwrap() = Some((n, token));
        self
    }

    pub fn calls_to(&self, method: &str) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl WalletProvider for ScriptedProvider {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, AppError> {
        self.calls.lock().unwrap().push(Call {
            method: method.to_string(),
            params,
            at: Instant::now(),
        });

        if method == "eth_getTransactionReceipt" {
            let polls = self.calls_to(method).len();
            if let Some((n, token)) = self.cancel_on_receipt_poll.lock().unwrap().as_ref() {
                if polls == *n {
                    token.cancel();
                }
            }
        }

        if let Some(reply) = self
            .replies
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(VecDeque::pop_front)
        {
            return reply;
        }
        match self.fallback.lock().unwrap().get(method) {
            Some(v) => Ok(v.clone()),
            None => Err(AppError::ProviderError(format!("unscripted method {}", method))),
        }
    }
}

pub fn receipt(status: &str, block: &str) -> Value {
    json!({
        "transactionHash": "0x123",
        "status": status,
        "blockNumber": block,
        "logs": [],
    })
}
