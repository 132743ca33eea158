use crate::services::tx::types::TrackerOptions;
use config::{ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub wallet: WalletConfig,
    #[serde(default)]
    pub tracker: TrackerOptions,
    pub demo: DemoConfig,
}

/// 钱包连接方式
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    /// 节点托管账户（eth_accounts / eth_sendTransaction）
    Rpc,
    /// 本地私钥签名，私钥来自环境变量 WALLET_PRIVATE_KEY
    Local,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WalletConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub connector: ConnectorKind,
    pub max_retries: usize,
    pub base_delay_ms: u64,
    /// 链不支持 EIP-1559 时，合约库路径改发 legacy 交易
    #[serde(default)]
    pub legacy_tx: bool,
}

/// 演示流程的参数
#[derive(Debug, Deserialize, Clone)]
pub struct DemoConfig {
    pub recipient: String,
    pub amount: String,
    pub contract_address: Option<String>,
    pub contract_abi: Vec<String>,
    pub contract_write_fn: String,
    pub contract_read_fn: String,
    pub message: String,
    pub username: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        config::Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__WALLET__RPC_URL=... 覆盖 wallet.rpc_url
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()
    }
}
