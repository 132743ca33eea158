use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ethers_core::abi::Abi;
use ethers_core::types::{Address, U256};
use ethers_middleware::SignerMiddleware;
use ethers_providers::{Http, Middleware, Provider};
use ethers_signers::LocalWallet;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, ConnectorKind, DemoConfig};
use crate::errors::AppError;
use crate::infrastructure::connector::{Connector, LocalWalletConnector, RpcConnector};
use crate::infrastructure::provider::{RetryAdapter, RpcWalletProvider, WalletProvider};
use crate::services::signature::{SignedProfile, verify_profile};
use crate::services::tx::AbiEncoder;
use crate::services::{ContractService, WalletService};
use crate::{log_error, log_info, log_warn};

/// 合约库路径的签名方，与所选钱包接入方式一致
pub enum ContractClient {
    /// 节点托管账户签名
    Node(ContractService<Provider<Http>>),
    /// 本地私钥签名后发送 eth_sendRawTransaction
    Local(ContractService<SignerMiddleware<Provider<Http>, LocalWallet>>),
}

/// 演示应用：按顺序跑一遍连接、余额、签名、转账、合约调用
pub struct Application {
    pub wallet: Arc<WalletService>,
    pub contract: Option<ContractClient>,
    demo: DemoConfig,
}

pub type Result<T> = std::result::Result<T, AppError>;

impl Application {
    pub fn build(config: Config) -> Result<Self> {
        let rpc = RpcWalletProvider::new(&config.wallet)?;
        let http_client = rpc.inner();

        // 只读请求带重试，提交/签名请求透传
        let provider = Arc::new(RetryAdapter::new(
            Arc::new(rpc),
            config.wallet.max_retries,
            Duration::from_millis(config.wallet.base_delay_ms),
        )) as Arc<dyn WalletProvider>;

        let (connector, local_wallet): (Arc<dyn Connector>, Option<LocalWallet>) =
            match config.wallet.connector {
                ConnectorKind::Rpc => (Arc::new(RpcConnector::new(provider)), None),
                ConnectorKind::Local => {
                    let local = LocalWalletConnector::from_env(config.wallet.chain_id, provider)?;
                    let wallet = local.wallet().clone();
                    (Arc::new(local), Some(wallet))
                }
            };
        log_info!("钱包接入方式: {}", connector.name());

        let encoder = AbiEncoder::from_human_readable(&config.demo.contract_abi)?;
        let contract = build_contract_client(&config, encoder.abi(), http_client, local_wallet)?;

        let wallet = Arc::new(WalletService::new(
            connector,
            Arc::new(encoder),
            config.tracker,
        ));

        Ok(Self {
            wallet,
            contract,
            demo: config.demo,
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let cancel = CancellationToken::new();

        // Ctrl+C 中断正在进行的轮询
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log_warn!("⚠️  Received shutdown signal, cancelling pending polls...");
                on_signal.cancel();
            }
        });

        let conn = self.wallet.connect().await.context("连接钱包失败")?;
        let account = conn.account()?;

        match self.wallet.get_balance().await {
            Ok(balance) => log_info!("余额: {} ETH", balance),
            Err(e) => log_error!("查询余额失败: {}", e),
        }

        self.run_signatures().await;

        let recipient = parse_address(&self.demo.recipient)?;
        let result = self
            .wallet
            .send_transfer(recipient, &self.demo.amount, &cancel)
            .await
            .context("转账参数无效")?;
        log_info!("转账结果: hash={:?}, {}", result.handle, result.outcome);

        match &self.contract {
            Some(ContractClient::Node(contract)) => self.run_contract(contract, account, &cancel).await?,
            Some(ContractClient::Local(contract)) => self.run_contract(contract, account, &cancel).await?,
            None => log_info!("未配置合约地址，跳过合约调用"),
        }

        log_info!("✔️ Demo finished");
        Ok(())
    }

    async fn run_signatures(&self) {
        match self.wallet.sign_message(&self.demo.message).await {
            Ok(sig) => match self.wallet.verify_message(&self.demo.message, &sig) {
                Ok(signer) => log_info!("消息签名: {} (签名者 {:?})", sig, signer),
                Err(e) => log_error!("验签失败: {}", e),
            },
            Err(e) => log_error!("消息签名失败: {}", e),
        }

        match self.wallet.sign_profile(&self.demo.username).await {
            Ok(signed) => {
                if let Some(valid) = check_profile(&signed) {
                    log_info!("用户资料已签名: {} valid={}", signed.profile.username, valid);
                }
            }
            Err(e) => log_error!("用户资料签名失败: {}", e),
        }
    }

    async fn run_contract<M: Middleware + 'static>(
        &self,
        contract: &ContractService<M>,
        account: Address,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let read_fn = self.demo.contract_read_fn.as_str();
        let write_fn = self.demo.contract_write_fn.as_str();

        // 路径一：高层合约库
        let before: U256 = contract.read(read_fn, ()).await.context("读取合约失败")?;
        log_info!("[contract] {}() = {}", read_fn, before);
        let result = contract.send(account, write_fn, (), cancel).await?;
        log_info!("[contract] {}() -> {}", write_fn, result.outcome);

        // 路径二：原始 JSON-RPC + 回执轮询
        let result = self
            .wallet
            .call_contract(contract.address(), write_fn, &[], cancel)
            .await?;
        log_info!("[raw rpc] {}() hash={:?} -> {}", write_fn, result.handle, result.outcome);

        let after = self
            .wallet
            .read_contract(contract.address(), read_fn, &[])
            .await?;
        log_info!("[raw rpc] {}() = {:?}", read_fn, after);
        Ok(())
    }
}

/// 本地私钥时合约库也经由同一把私钥签名
fn build_contract_client(
    config: &Config,
    abi: &Abi,
    http_client: Arc<Provider<Http>>,
    local_wallet: Option<LocalWallet>,
) -> Result<Option<ContractClient>> {
    let Some(addr) = config.demo.contract_address.as_deref() else {
        return Ok(None);
    };
    let address = parse_address(addr)?;
    let options = config.tracker.clone();
    let legacy = config.wallet.legacy_tx;

    let client = match local_wallet {
        Some(wallet) => {
            let signer = Arc::new(SignerMiddleware::new(http_client.as_ref().clone(), wallet));
            ContractClient::Local(ContractService::new(address, abi.clone(), signer, options).with_legacy(legacy))
        }
        None => ContractClient::Node(
            ContractService::new(address, abi.clone(), http_client, options).with_legacy(legacy),
        ),
    };
    Ok(Some(client))
}

/// 验签出错时记录原因并返回 None，不当作 valid=false
fn check_profile(signed: &SignedProfile) -> Option<bool> {
    match verify_profile(signed) {
        Ok(valid) => Some(valid),
        Err(e) => {
            log_error!("用户资料验签失败: {}", e);
            None
        }
    }
}

fn parse_address(s: &str) -> Result<Address> {
    s.parse::<Address>()
        .map_err(|_| AppError::InvalidAddress(s.to_string()))
}
