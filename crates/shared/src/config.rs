//! 配置管理模块
//!
//! 命令行参数与环境变量共同决定最终配置，优先级从高到低：
//! 环境变量 > 命令行参数 > 默认值。

use clap::Parser;

use crate::error::{InfraError, Result};

/// 服务配置
#[derive(Debug, Clone, Parser)]
#[command(name = "loyalty-service", about = "积分系统后端服务")]
pub struct Config {
    /// HTTP 监听地址，host:port
    #[arg(short = 'a', long = "address", default_value = "localhost:8080")]
    pub run_address: String,

    /// PostgreSQL 连接串
    #[arg(short = 'd', long = "database-uri", default_value = "")]
    pub database_uri: String,

    /// 积分计算（accrual）服务基地址
    #[arg(short = 'r', long = "accrual-address", default_value = "")]
    pub accrual_address: String,

    /// 日志级别
    #[arg(short = 'l', long = "log-level", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// 从命令行参数和环境变量加载配置
    ///
    /// 数据库连接串和 accrual 地址没有合理默认值，缺失时返回错误，
    /// 由 main 以非零退出码终止进程。
    pub fn load() -> Result<Self> {
        let mut config = Self::parse();
        config.apply_env_from(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// 用环境变量覆盖已解析的配置项
    ///
    /// 通过闭包注入取值函数，测试可以不触碰进程环境。
    fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(value) = get("RUN_ADDRESS").filter(|v| !v.is_empty()) {
            self.run_address = value;
        }
        if let Some(value) = get("DATABASE_URI").filter(|v| !v.is_empty()) {
            self.database_uri = value;
        }
        if let Some(value) = get("ACCRUAL_SYSTEM_ADDRESS").filter(|v| !v.is_empty()) {
            self.accrual_address = value;
        }
        if let Some(value) = get("LOG_LEVEL").filter(|v| !v.is_empty()) {
            self.log_level = value;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.database_uri.is_empty() {
            return Err(InfraError::Config(
                "数据库连接串未设置（DATABASE_URI 或 -d）".to_string(),
            ));
        }
        if self.accrual_address.is_empty() {
            return Err(InfraError::Config(
                "accrual 服务地址未设置（ACCRUAL_SYSTEM_ADDRESS 或 -r）".to_string(),
            ));
        }

        Ok(())
    }
}
