use super::connector_trait::{Connection, Connector};
use crate::errors::AppError;
use crate::infrastructure::provider::WalletProvider;
use crate::utils::parse_hex_u256;
use crate::{log_debug, log_info};
use async_trait::async_trait;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, Bytes, TransactionRequest, U256};
use ethers_signers::{LocalWallet, Signer};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

pub const PRIVATE_KEY_ENV: &str = "WALLET_PRIVATE_KEY";

/// gas limit 在估算值上加 20%
const GAS_LIMIT_BUFFER_PERCENT: u64 = 120;

/// 本地私钥钱包：签名在本进程完成，其余请求转发给节点
pub struct LocalWalletConnector {
    provider: Arc<LocalWalletProvider>,
}

impl LocalWalletConnector {
    pub fn new(wallet: LocalWallet, inner: Arc<dyn WalletProvider>) -> Self {
        Self {
            provider: Arc::new(LocalWalletProvider { wallet, inner }),
        }
    }

    /// 从环境变量 WALLET_PRIVATE_KEY 加载私钥并绑定 chain_id
    pub fn from_env(chain_id: u64, inner: Arc<dyn WalletProvider>) -> Result<Self, AppError> {
        let key = std::env::var(PRIVATE_KEY_ENV)
            .map_err(|_| AppError::Validation(format!("环境变量 {} 未设置", PRIVATE_KEY_ENV)))?;
        let wallet = key
            .trim()
            .parse::<LocalWallet>()
            .map_err(|e| AppError::Signature(format!("私钥格式错误: {}", e)))?
            .with_chain_id(chain_id);
        Ok(Self::new(wallet, inner))
    }

    pub fn address(&self) -> Address {
        self.provider.wallet.address()
    }

    /// 同一把私钥，供合约库路径的 SignerMiddleware 使用
    pub fn wallet(&self) -> &LocalWallet {
        &self.provider.wallet
    }
}

#[async_trait]
impl Connector for LocalWalletConnector {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn connect(&self) -> Result<Connection, AppError> {
        let chain_id = self.provider.wallet.chain_id();
        log_info!("[{}] 使用本地钱包 {:?}, chain_id={}", self.name(), self.address(), chain_id);
        Ok(Connection {
            accounts: vec![self.address()],
            chain_id,
        })
    }

    fn provider(&self) -> Arc<dyn WalletProvider> {
        self.provider.clone()
    }
}

#[derive(Debug, Deserialize)]
struct SendTxParams {
    from: Option<Address>,
    to: Address,
    value: Option<U256>,
    data: Option<Bytes>,
}

pub struct LocalWalletProvider {
    wallet: LocalWallet,
    inner: Arc<dyn WalletProvider>,
}

impl LocalWalletProvider {
    fn first_param(method: &str, params: &[Value]) -> Result<Value, AppError> {
        params
            .first()
            .cloned()
            .ok_or_else(|| AppError::Validation(format!("{} 缺少参数", method)))
    }

    async fn quantity(&self, method: &str, params: Vec<Value>) -> Result<U256, AppError> {
        parse_hex_u256(&self.inner.request(method, params).await?)
    }

    /// 填充 nonce / gas，本地签名后用 eth_sendRawTransaction 广播
    async fn send_transaction(&self, params: Vec<Value>) -> Result<Value, AppError> {
        let p: SendTxParams = serde_json::from_value(Self::first_param("eth_sendTransaction", &params)?)?;
        let address = self.wallet.address();
        if p.from.is_some_and(|from| from != address) {
            return Err(AppError::Validation(format!(
                "from {:?} 与本地钱包 {:?} 不一致",
                p.from, address
            )));
        }

        let nonce = self
            .quantity("eth_getTransactionCount", vec![json!(address), json!("pending")])
            .await?;
        let gas_price = self.quantity("eth_gasPrice", vec![]).await?;

        let mut tx = TransactionRequest::new()
            .from(address)
            .to(p.to)
            .nonce(nonce)
            .gas_price(gas_price)
            .chain_id(self.wallet.chain_id());
        if let Some(value) = p.value {
            tx = tx.value(value);
        }
        if let Some(data) = p.data {
            tx = tx.data(data);
        }

        let estimated = self
            .quantity("eth_estimateGas", vec![serde_json::to_value(&tx)?])
            .await?;
        tx = tx.gas(estimated * GAS_LIMIT_BUFFER_PERCENT / 100);

        let typed: TypedTransaction = tx.into();
        let signature = self
            .wallet
            .sign_transaction(&typed)
            .await
            .map_err(|e| AppError::Signature(format!("交易签名失败: {}", e)))?;
        log_debug!("本地签名完成 nonce={} gas_price={}", nonce, gas_price);

        self.inner
            .request("eth_sendRawTransaction", vec![json!(typed.rlp_signed(&signature))])
            .await
    }

    /// personal_sign(hexMessage, account)
    async fn personal_sign(&self, params: Vec<Value>) -> Result<Value, AppError> {
        let message = Self::first_param("personal_sign", &params)?;
        let message = message
            .as_str()
            .ok_or_else(|| AppError::Validation("personal_sign 消息必须是字符串".to_string()))?;
        let bytes = match message.strip_prefix("0x") {
            Some(hex_body) => hex::decode(hex_body)?,
            None => message.as_bytes().to_vec(),
        };

        let signature = self
            .wallet
            .sign_message(bytes)
            .await
            .map_err(|e| AppError::Signature(format!("消息签名失败: {}", e)))?;
        Ok(json!(format!("0x{}", signature)))
    }
}

#[async_trait]
impl WalletProvider for LocalWalletProvider {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, AppError> {
        match method {
            "eth_accounts" | "eth_requestAccounts" => Ok(json!([self.wallet.address()])),
            "eth_sendTransaction" => self.send_transaction(params).await,
            "personal_sign" => self.personal_sign(params).await,
            _ => self.inner.request(method, params).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::types::Signature;
    use ethers_core::utils::rlp::Rlp;
    use std::str::FromStr;
    use std::sync::Mutex;

    // anvil 默认账户 0
    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[derive(Default)]
    struct Node {
        calls: Mutex<Vec<(String, Vec<Value>)>>,
    }

    #[async_trait]
    impl WalletProvider for Node {
        async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, AppError> {
            self.calls.lock().unwrap().push((method.to_string(), params));
            Ok(match method {
                "eth_getTransactionCount" => json!("0x3"),
                "eth_gasPrice" => json!("0x3b9aca00"),
                "eth_estimateGas" => json!("0x5208"),
                "eth_sendRawTransaction" => json!("0xabc"),
                "eth_chainId" => json!("0x7a69"),
                _ => Value::Null,
            })
        }
    }

    fn connector(node: Arc<Node>) -> LocalWalletConnector {
        let wallet = KEY.parse::<LocalWallet>().unwrap().with_chain_id(31337u64);
        LocalWalletConnector::new(wallet, node)
    }

    #[tokio::test]
    async fn connect_reports_local_account() {
        let conn = connector(Arc::new(Node::default())).connect().await.unwrap();
        assert_eq!(conn.account().unwrap(), ADDRESS.parse::<Address>().unwrap());
        assert_eq!(conn.chain_id, 31337);
    }

    #[tokio::test]
    async fn send_transaction_signs_and_broadcasts_raw() {
        let node = Arc::new(Node::default());
        let provider = connector(node.clone()).provider();

        let hash = provider
            .request(
                "eth_sendTransaction",
                vec![json!({"from": ADDRESS, "to": "0x00000000000000000000000000000000000000bb", "value": "0x10"})],
            )
            .await
            .unwrap();
        assert_eq!(hash, json!("0xabc"));

        let calls = node.calls.lock().unwrap();
        let methods: Vec<&str> = calls.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(
            methods,
            ["eth_getTransactionCount", "eth_gasPrice", "eth_estimateGas", "eth_sendRawTransaction"]
        );

        let raw = calls[3].1[0].as_str().unwrap();
        let bytes = hex::decode(raw.trim_start_matches("0x")).unwrap();
        let (decoded, _sig) = TypedTransaction::decode_signed(&Rlp::new(&bytes)).unwrap();
        assert_eq!(decoded.nonce(), Some(&U256::from(3)));
        // 21000 * 1.2
        assert_eq!(decoded.gas(), Some(&U256::from(25200)));
        assert_eq!(decoded.value(), Some(&U256::from(16)));
    }

    #[tokio::test]
    async fn rejects_foreign_sender() {
        let provider = connector(Arc::new(Node::default())).provider();
        let err = provider
            .request(
                "eth_sendTransaction",
                vec![json!({"from": "0x00000000000000000000000000000000000000aa", "to": ADDRESS})],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn personal_sign_is_recoverable() {
        let provider = connector(Arc::new(Node::default())).provider();
        let sig = provider
            .request("personal_sign", vec![json!("0x68656c6c6f"), json!(ADDRESS)])
            .await
            .unwrap();
        let sig = Signature::from_str(sig.as_str().unwrap()).unwrap();
        assert_eq!(sig.recover("hello").unwrap(), ADDRESS.parse::<Address>().unwrap());
    }

    #[tokio::test]
    async fn other_methods_are_forwarded() {
        let node = Arc::new(Node::default());
        let provider = connector(node.clone()).provider();
        assert_eq!(provider.request("eth_chainId", vec![]).await.unwrap(), json!("0x7a69"));
        assert_eq!(node.calls.lock().unwrap().len(), 1);
    }
}
