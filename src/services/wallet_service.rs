// services/wallet_service.rs

use crate::errors::AppError;
use crate::infrastructure::connector::{Connection, Connector};
use crate::infrastructure::provider::WalletProvider;
use crate::log_info;
use crate::services::signature::{self, SignedProfile, UserProfile};
use crate::services::tx::encoder::TransactionEncoder;
use crate::services::tx::tracker::submit_and_confirm;
use crate::services::tx::types::{TrackerOptions, TransactionRequest, TxResult};
use crate::utils::{ether_to_wei, parse_hex_u256, wei_to_ether};
use bigdecimal::BigDecimal;
use ethers_core::abi::Token;
use ethers_core::types::{Address, Bytes};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// 钱包侧的用户操作：连接、余额、转账、合约调用（原始 RPC 路径）、签名
pub struct WalletService {
    connector: Arc<dyn Connector>,
    provider: Arc<dyn WalletProvider>,
    encoder: Arc<dyn TransactionEncoder>,
    options: TrackerOptions,
    connection: RwLock<Option<Connection>>,
}

impl WalletService {
    pub fn new(
        connector: Arc<dyn Connector>,
        encoder: Arc<dyn TransactionEncoder>,
        options: TrackerOptions,
    ) -> Self {
        let provider = connector.provider();
        Self {
            connector,
            provider,
            encoder,
            options,
            connection: RwLock::new(None),
        }
    }

    pub async fn connect(&self) -> Result<Connection, AppError> {
        let conn = self.connector.connect().await?;
        log_info!(
            "钱包已连接 [{}]: {:?}, chain_id={}",
            self.connector.name(),
            conn.account()?,
            conn.chain_id
        );
        *self.connection.write().await = Some(conn.clone());
        Ok(conn)
    }

    /// 当前账户（accounts[0]），未连接时报错
    pub async fn account(&self) -> Result<Address, AppError> {
        self.connection
            .read()
            .await
            .as_ref()
            .ok_or_else(|| AppError::WalletNotConnected("请先调用 connect()".to_string()))?
            .account()
    }

    pub async fn chain_id(&self) -> Result<u64, AppError> {
        self.connection
            .read()
            .await
            .as_ref()
            .map(|c| c.chain_id)
            .ok_or_else(|| AppError::WalletNotConnected("请先调用 connect()".to_string()))
    }

    /// 余额（ether）
    pub async fn get_balance(&self) -> Result<BigDecimal, AppError> {
        let account = self.account().await?;
        let raw = self
            .provider
            .request("eth_getBalance", vec![json!(account), json!("latest")])
            .await?;
        let balance = wei_to_ether(parse_hex_u256(&raw)?);
        log_info!("账户 {:?} 余额: {} ETH", account, balance);
        Ok(balance)
    }

    /// 原生币转账，amount 以 ether 为单位（如 "0.01"）
    pub async fn send_transfer(
        &self,
        to: Address,
        amount: &str,
        cancel: &CancellationToken,
    ) -> Result<TxResult, AppError> {
        let from = self.account().await?;
        let value = ether_to_wei(amount)?;
        log_info!("发起转账: {:?} -> {:?}, 金额 {} ETH", from, to, amount);

        let request = TransactionRequest::transfer(from, to, value);
        Ok(submit_and_confirm(&request, self.provider.as_ref(), &self.options, cancel).await)
    }

    /// 绕过合约库：编码 calldata 后直接 eth_sendTransaction 并轮询回执
    pub async fn call_contract(
        &self,
        contract: Address,
        function: &str,
        args: &[Token],
        cancel: &CancellationToken,
    ) -> Result<TxResult, AppError> {
        let from = self.account().await?;
        let data = self.encoder.encode_call(function, args)?;
        log_info!("调用合约 {:?}.{} ({} 字节 calldata)", contract, function, data.len());

        let request = TransactionRequest::contract_call(from, contract, data);
        Ok(submit_and_confirm(&request, self.provider.as_ref(), &self.options, cancel).await)
    }

    /// eth_call 只读调用并解码返回值
    pub async fn read_contract(
        &self,
        contract: Address,
        function: &str,
        args: &[Token],
    ) -> Result<Vec<Token>, AppError> {
        let from = self.account().await?;
        let data = self.encoder.encode_call(function, args)?;
        let raw = self
            .provider
            .request(
                "eth_call",
                vec![json!({"from": from, "to": contract, "data": data}), json!("latest")],
            )
            .await?;
        let output: Bytes = serde_json::from_value(raw)?;
        self.encoder.decode_output(function, &output)
    }

    pub async fn sign_message(&self, message: &str) -> Result<String, AppError> {
        let account = self.account().await?;
        signature::sign_message(self.provider.as_ref(), account, message).await
    }

    pub fn verify_message(&self, message: &str, signature: &str) -> Result<Address, AppError> {
        signature::verify_message(message, signature)
    }

    /// 用当前账户签署用户资料
    pub async fn sign_profile(&self, username: &str) -> Result<SignedProfile, AppError> {
        let profile = UserProfile::new(self.account().await?, username, self.chain_id().await?);
        signature::sign_profile(self.provider.as_ref(), profile).await
    }
}
