//! 用户积分余额

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// 余额快照
///
/// 不变式：`current >= 0`，且对每个用户
/// `current + withdrawn = Σ(已 PROCESSED 订单的 accrual)`。
#[derive(Debug, Clone, Copy, FromRow, Serialize)]
pub struct Balance {
    pub current: Decimal,
    pub withdrawn: Decimal,
}
