// services/signature/signature_service.rs

use crate::errors::AppError;
use crate::infrastructure::provider::WalletProvider;
use crate::log_info;
use crate::utils::to_hex_message;
use chrono::{DateTime, Utc};
use ethers_core::types::{Address, Signature};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;

/// 需要钱包签名背书的用户资料
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub address: Address,
    pub username: String,
    pub chain_id: u64,
    pub issued_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(address: Address, username: impl Into<String>, chain_id: u64) -> Self {
        Self {
            address,
            username: username.into(),
            chain_id,
            issued_at: Utc::now(),
        }
    }

    /// 签名的原文：字段顺序固定的 JSON
    pub fn canonical_payload(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedProfile {
    pub profile: UserProfile,
    pub signature: String,
}

/// personal_sign 通过钱包完成；验签用 ethers-core 本地恢复地址
pub async fn sign_message(
    provider: &dyn WalletProvider,
    account: Address,
    message: &str,
) -> Result<String, AppError> {
    let result = provider
        .request("personal_sign", vec![json!(to_hex_message(message)), json!(account)])
        .await?;
    let signature = result
        .as_str()
        .ok_or_else(|| AppError::Signature(format!("personal_sign 返回值非法: {}", result)))?;
    log_info!("消息已签名: account={:?}", account);
    Ok(signature.to_string())
}

/// 恢复签名者地址
pub fn verify_message(message: &str, signature: &str) -> Result<Address, AppError> {
    let sig = Signature::from_str(signature)
        .map_err(|e| AppError::Signature(format!("签名格式错误: {}", e)))?;
    sig.recover(message)
        .map_err(|e| AppError::Signature(format!("签名恢复失败: {}", e)))
}

pub async fn sign_profile(
    provider: &dyn WalletProvider,
    profile: UserProfile,
) -> Result<SignedProfile, AppError> {
    let payload = profile.canonical_payload()?;
    let signature = sign_message(provider, profile.address, &payload).await?;
    Ok(SignedProfile { profile, signature })
}

/// 签名者必须是资料里声明的地址
pub fn verify_profile(signed: &SignedProfile) -> Result<bool, AppError> {
    let payload = signed.profile.canonical_payload()?;
    let recovered = verify_message(&payload, &signed.signature)?;
    Ok(recovered == signed.profile.address)
}
