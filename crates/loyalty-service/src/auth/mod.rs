//! 认证模块
//!
//! 密码哈希与会话 token 的签发/校验。

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::TokenManager;
