//! 基础设施错误类型

use thiserror::Error;

/// 基础设施层错误
///
/// 只覆盖配置、数据库连接和日志初始化。业务错误定义在服务 crate 里。
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, InfraError>;
