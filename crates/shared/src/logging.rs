//! 日志初始化模块
//!
//! 级别来自配置的 LOG_LEVEL，RUST_LOG 环境变量优先。

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{InfraError, Result};

/// 初始化全局日志订阅器
pub fn init(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| InfraError::Internal(format!("日志初始化失败: {}", e)))?;

    Ok(())
}
