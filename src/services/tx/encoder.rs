// services/tx/encoder.rs

use crate::errors::AppError;
use ethers_core::abi::{Abi, Token, parse_abi};
use ethers_core::types::Bytes;

/// 函数名 + 参数 → calldata；返回数据 → tokens
pub trait TransactionEncoder: Send + Sync {
    fn encode_call(&self, function: &str, args: &[Token]) -> Result<Bytes, AppError>;
    fn decode_output(&self, function: &str, data: &[u8]) -> Result<Vec<Token>, AppError>;
}

/// 基于 ethers-core ABI 的编码器，ABI 用人类可读格式声明
#[derive(Debug, Clone)]
pub struct AbiEncoder {
    abi: Abi,
}

impl AbiEncoder {
    pub fn new(abi: Abi) -> Self {
        Self { abi }
    }

    /// 例: ["function increment()", "function number() view returns (uint256)"]
    pub fn from_human_readable<S: AsRef<str>>(signatures: &[S]) -> Result<Self, AppError> {
        let sigs: Vec<&str> = signatures.iter().map(AsRef::as_ref).collect();
        let abi = parse_abi(&sigs).map_err(|e| AppError::Encoding(format!("ABI 解析失败: {}", e)))?;
        Ok(Self::new(abi))
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }
}

impl TransactionEncoder for AbiEncoder {
    fn encode_call(&self, function: &str, args: &[Token]) -> Result<Bytes, AppError> {
        let func = self
            .abi
            .function(function)
            .map_err(|e| AppError::Encoding(format!("未知函数 {}: {}", function, e)))?;
        let data = func
            .encode_input(args)
            .map_err(|e| AppError::Encoding(format!("{} 参数编码失败: {}", function, e)))?;
        Ok(data.into())
    }

    fn decode_output(&self, function: &str, data: &[u8]) -> Result<Vec<Token>, AppError> {
        let func = self
            .abi
            .function(function)
            .map_err(|e| AppError::Encoding(format!("未知函数 {}: {}", function, e)))?;
        func.decode_output(data)
            .map_err(|e| AppError::Encoding(format!("{} 返回值解码失败: {}", function, e)))
    }
}
