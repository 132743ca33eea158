use crate::errors::AppError;
use ethers_core::types::U256;
use serde_json::Value;

/// 解析 JSON-RPC 的十六进制数量（如 "0x2a"），兼容数字形式
pub fn parse_hex_quantity(value: &Value) -> Result<u64, AppError> {
    match value {
        Value::String(s) => hex_str_to_u64(s),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| AppError::InvalidNumber(format!("非法数量: {}", n))),
        other => Err(AppError::InvalidNumber(format!("非法数量: {}", other))),
    }
}

pub fn hex_str_to_u64(s: &str) -> Result<u64, AppError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| AppError::InvalidNumber(format!("缺少 0x 前缀: {}", s)))?;
    if digits.is_empty() {
        return Err(AppError::InvalidNumber(format!("空的十六进制数量: {}", s)));
    }
    Ok(u64::from_str_radix(digits, 16)?)
}

/// 余额等大数（可能超过 u64）
pub fn parse_hex_u256(value: &Value) -> Result<U256, AppError> {
    let s = value
        .as_str()
        .ok_or_else(|| AppError::InvalidNumber(format!("非法数量: {}", value)))?;
    U256::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| AppError::InvalidNumber(format!("U256({}) 解析失败: {}", s, e)))
}

/// personal_sign 需要 0x 前缀的十六进制消息
pub fn to_hex_message(message: &str) -> String {
    format!("0x{}", hex::encode(message.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_hex_and_numeric_quantities() {
        assert_eq!(parse_hex_quantity(&json!("0x2a")).unwrap(), 42);
        assert_eq!(parse_hex_quantity(&json!("0x0")).unwrap(), 0);
        assert_eq!(parse_hex_quantity(&json!(7)).unwrap(), 7);
    }

    #[test]
    fn rejects_malformed_quantities() {
        assert!(parse_hex_quantity(&json!("42")).is_err());
        assert!(parse_hex_quantity(&json!("0x")).is_err());
        assert!(parse_hex_quantity(&json!("0xzz")).is_err());
        assert!(parse_hex_quantity(&Value::Null).is_err());
    }

    #[test]
    fn balance_above_u64_range() {
        let v = parse_hex_u256(&json!("0x1bc16d674ec800000")).unwrap();
        assert_eq!(v, U256::from_dec_str("32000000000000000000").unwrap());
    }

    #[test]
    fn message_is_hex_encoded() {
        assert_eq!(to_hex_message("hi"), "0x6869");
    }
}
