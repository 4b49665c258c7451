//! 积分提现记录

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// 提现记录，写入后不可变
///
/// 序列化格式即对外 JSON 契约。
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Withdrawal {
    #[serde(rename = "order")]
    pub order_number: String,
    pub sum: Decimal,
    pub processed_at: DateTime<Utc>,
}
