//! 订单模型与状态机
//!
//! 订单状态只能沿状态机前进，终态之后不再变化。所有历史上
//! 出现过的状态表示在这里统一为一个枚举。

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// 订单状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// 刚上传，尚未进入 accrual 计算
    #[default]
    New,
    /// accrual 正在计算
    Processing,
    /// 计算完成，积分已确定（终态）
    Processed,
    /// 订单无效，不产生积分（终态）
    Invalid,
}

impl OrderStatus {
    /// 终态订单不再接受任何更新
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Processed | Self::Invalid)
    }

    /// 状态机合法迁移判断
    ///
    /// ```text
    /// NEW        → PROCESSING | PROCESSED | INVALID
    /// PROCESSING → PROCESSED | INVALID
    /// PROCESSED / INVALID → 终态
    /// ```
    ///
    /// 不合法的迁移由调用方静默忽略。
    pub fn is_updatable_transition(new: OrderStatus, current: OrderStatus) -> bool {
        match current {
            Self::New => matches!(new, Self::Processing | Self::Processed | Self::Invalid),
            Self::Processing => matches!(new, Self::Processed | Self::Invalid),
            Self::Processed | Self::Invalid => false,
        }
    }
}

/// 用户订单
///
/// 序列化格式即对外 JSON 契约：时间为 RFC3339 UTC。
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub number: String,
    pub status: OrderStatus,
    pub accrual: Decimal,
    pub uploaded_at: DateTime<Utc>,
}

/// 待对账订单（来自分页扫描，带归属用户）
#[derive(Debug, Clone, FromRow)]
pub struct PendingOrder {
    pub user_id: Uuid,
    pub number: String,
    pub status: OrderStatus,
}

/// 一次对账写回
#[derive(Debug, Clone)]
pub struct OrderUpdate {
    pub user_id: Uuid,
    pub number: String,
    pub status: OrderStatus,
    pub accrual: Decimal,
}
