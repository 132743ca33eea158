use crate::errors::AppError;
use bigdecimal::BigDecimal;
use ethers_core::types::U256;
use ethers_core::utils::parse_ether;
use std::str::FromStr;

const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

/// 将U256 BigDecimal
pub fn u256_to_bigdecimal(value: U256) -> BigDecimal {
    // 先转字符串再转 BigDecimal (处理大数最稳)
    BigDecimal::from_str(&value.to_string()).unwrap_or_else(|_| BigDecimal::from(0))
}

/// wei → ether（去掉多余的尾随 0）
pub fn wei_to_ether(value: U256) -> BigDecimal {
    (u256_to_bigdecimal(value) / BigDecimal::from(WEI_PER_ETHER)).normalized()
}

/// 用户输入的 ether 金额 → wei，拒绝空值和非正数
pub fn ether_to_wei(amount: &str) -> Result<U256, AppError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(AppError::Validation("金额不能为空".to_string()));
    }
    let wei = parse_ether(amount)
        .map_err(|e| AppError::InvalidNumber(format!("金额 {} 无效: {}", amount, e)))?;
    if wei.is_zero() {
        return Err(AppError::Validation(format!("金额必须大于 0: {}", amount)));
    }
    Ok(wei)
}
