//! 密码处理
//!
//! bcrypt 单向哈希，盐随哈希一起存储。

use bcrypt::{DEFAULT_COST, hash, verify};

use crate::error::{AppError, Result};

/// 对密码进行哈希处理
pub fn hash_password(password: &str) -> Result<String> {
    hash(password, DEFAULT_COST).map_err(|e| AppError::Internal(format!("密码哈希失败: {}", e)))
}

/// 校验明文密码与存储的哈希值是否匹配
pub fn verify_password(password: &str, hashed: &str) -> Result<bool> {
    verify(password, hashed).map_err(|e| AppError::Internal(format!("密码校验失败: {}", e)))
}
