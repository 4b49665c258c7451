//! accrual 服务客户端
//!
//! 单请求客户端：`GET {base}/api/orders/{number}`，3 秒超时。
//! 把 accrual 的响应归一化为一个结果变体，限流（429）作为正常
//! 结果返回给调用方，由调用方决定何时恢复请求。

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::models::OrderStatus;

/// 客户端请求超时
const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Retry-After 解析失败时的兜底等待时长
pub const RETRY_AFTER_DEFAULT: Duration = Duration::from_secs(60);

/// accrual 服务侧的订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccrualStatus {
    Registered,
    Processing,
    Invalid,
    Processed,
}

impl AccrualStatus {
    /// 翻译为内部订单状态
    pub fn into_order_status(self) -> OrderStatus {
        match self {
            Self::Registered => OrderStatus::New,
            Self::Processing => OrderStatus::Processing,
            Self::Invalid => OrderStatus::Invalid,
            Self::Processed => OrderStatus::Processed,
        }
    }
}

/// accrual 响应体
#[derive(Debug, Deserialize)]
struct AccrualResponse {
    order: String,
    status: AccrualStatus,
    #[serde(default)]
    accrual: Decimal,
}

/// 归一化后的单次查询结果
#[derive(Debug, Clone, PartialEq)]
pub enum AccrualUpdate {
    /// 订单已被 accrual 受理，携带其状态和积分数
    Ok {
        number: String,
        status: AccrualStatus,
        accrual: Decimal,
    },
    /// 订单尚未在 accrual 注册（204）
    NotRegistered,
    /// accrual 限流（429），携带恢复等待时长
    Paused { retry_after: Duration },
}

/// accrual 客户端错误，对调用方而言都是瞬态的
#[derive(Debug, Error)]
pub enum AccrualError {
    #[error("accrual 请求失败: {0}")]
    Request(#[from] reqwest::Error),
    #[error("accrual 返回了意外状态码: {0}")]
    UnexpectedStatus(StatusCode),
}

/// accrual 服务客户端
///
/// 无状态，可以克隆后在多个任务间共享。
#[derive(Clone)]
pub struct AccrualClient {
    client: reqwest::Client,
    base_url: String,
}

impl AccrualClient {
    pub fn new(base_url: &str) -> Result<Self, AccrualError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 查询单个订单的 accrual 状态
    pub async fn order_status(&self, number: &str) -> Result<AccrualUpdate, AccrualError> {
        let url = format!("{}/api/orders/{}", self.base_url, number);
        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(AccrualUpdate::NotRegistered),
            StatusCode::TOO_MANY_REQUESTS => Ok(AccrualUpdate::Paused {
                retry_after: parse_retry_after(response.headers()),
            }),
            StatusCode::OK => {
                let body: AccrualResponse = response.json().await?;
                Ok(AccrualUpdate::Ok {
                    number: body.order,
                    status: body.status,
                    accrual: body.accrual,
                })
            }
            status => Err(AccrualError::UnexpectedStatus(status)),
        }
    }
}

/// 解析 Retry-After 头（单位为秒），失败时回落到默认值
fn parse_retry_after(headers: &HeaderMap) -> Duration {
    let parsed = headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    match parsed {
        Some(seconds) => Duration::from_secs(seconds),
        None => {
            warn!("accrual 的 Retry-After 头缺失或无法解析，使用默认等待时长");
            RETRY_AFTER_DEFAULT
        }
    }
}
