//! HTTP 处理器
//!
//! 每个存储调用都包一层 3 秒超时：超时对客户端表现为 500，
//! 对账任务则在自己的循环里记日志后继续。

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, Result};

pub mod auth;
pub mod balance;
pub mod orders;
pub mod withdrawals;

/// 单次存储调用的超时
pub(crate) const STORAGE_TIMEOUT: Duration = Duration::from_secs(3);

/// 给存储调用加超时
pub(crate) async fn with_timeout<T>(fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(STORAGE_TIMEOUT, fut)
        .await
        .map_err(|_| AppError::StorageTimeout)?
}
