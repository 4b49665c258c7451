//! 订单存储操作
//!
//! 包含后台对账任务依赖的分页扫描和批量写回。批量写回对每个
//! 订单行加排它锁，按状态机过滤非法迁移，并在订单首次进入
//! PROCESSED 时把积分记入持有者余额 —— 恰好一次。

use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use super::storage::Storage;
use crate::error::{AppError, Result};
use crate::models::{Order, OrderStatus, OrderUpdate, PendingOrder};

impl Storage {
    /// 上传订单
    ///
    /// 订单行（status=NEW，accrual=0）和归属边在同一事务里写入。
    /// 订单号已存在时返回当前持有者的 id，由调用方区分
    /// 「本人重复上传」和「他人占用」。
    pub async fn upload_order(&self, user_id: Uuid, number: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO orders (number, status, accrual) VALUES ($1, $2, 0) \
             ON CONFLICT (number) DO NOTHING",
        )
        .bind(number)
        .bind(OrderStatus::New)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            let (owner,): (Uuid,) =
                sqlx::query_as("SELECT user_id FROM users_orders WHERE order_number = $1")
                    .bind(number)
                    .fetch_one(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return Err(AppError::OrderNumberExists(owner));
        }

        sqlx::query("INSERT INTO users_orders (order_number, user_id) VALUES ($1, $2)")
            .bind(number)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(user_id = %user_id, number = %number, "订单已上传");
        Ok(())
    }

    /// 用户订单列表，最新的在前
    ///
    /// 上传时间相同的按订单号升序，保证排序稳定。
    pub async fn get_user_orders(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT o.number, o.status, o.accrual, o.uploaded_at \
             FROM orders o \
             JOIN users_orders uo ON uo.order_number = o.number \
             WHERE uo.user_id = $1 \
             ORDER BY o.uploaded_at DESC, o.number ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if orders.is_empty() {
            return Err(AppError::OrderForUserNotFound);
        }

        Ok(orders)
    }

    /// 分页取待对账订单（状态 NEW / PROCESSING），按上传时间升序
    ///
    /// 无结果时返回 `OrdersForUpdateNotFound`，提示对账任务把游标
    /// 重置回开头。
    pub async fn get_orders_for_update(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PendingOrder>> {
        let orders = sqlx::query_as::<_, PendingOrder>(
            "SELECT uo.user_id, o.number, o.status \
             FROM orders o \
             JOIN users_orders uo ON uo.order_number = o.number \
             WHERE o.status IN ('NEW', 'PROCESSING') \
             ORDER BY o.uploaded_at ASC \
             LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        if orders.is_empty() {
            return Err(AppError::OrdersForUpdateNotFound);
        }

        Ok(orders)
    }

    /// 批量写回对账结果，整批一个事务
    ///
    /// 每条记录：锁订单行 → 状态机校验（非法迁移跳过）→ 写入新
    /// 状态和积分；当新状态为 PROCESSED 且该行此前尚未计入积分
    /// （持久化的 accrual 为 0）时，把积分加到持有者余额上。
    /// 「恰好一次」由行锁 + 事务内的这条先验检查保证，不依赖
    /// 任何内存标记。
    pub async fn update_orders(&self, updates: &[OrderUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for update in updates {
            let row: Option<(OrderStatus, Decimal)> =
                sqlx::query_as("SELECT status, accrual FROM orders WHERE number = $1 FOR UPDATE")
                    .bind(&update.number)
                    .fetch_optional(&mut *tx)
                    .await?;

            let Some((current_status, current_accrual)) = row else {
                warn!(number = %update.number, "待更新订单不存在，跳过");
                continue;
            };

            if !OrderStatus::is_updatable_transition(update.status, current_status) {
                debug!(
                    number = %update.number,
                    current = ?current_status,
                    new = ?update.status,
                    "非法状态迁移，跳过"
                );
                continue;
            }

            sqlx::query("UPDATE orders SET status = $1, accrual = $2 WHERE number = $3")
                .bind(update.status)
                .bind(update.accrual)
                .bind(&update.number)
                .execute(&mut *tx)
                .await?;

            if update.status == OrderStatus::Processed && current_accrual.is_zero() {
                sqlx::query("UPDATE balance SET current = current + $1 WHERE user_id = $2")
                    .bind(update.accrual)
                    .bind(update.user_id)
                    .execute(&mut *tx)
                    .await?;

                debug!(
                    number = %update.number,
                    user_id = %update.user_id,
                    accrual = %update.accrual,
                    "订单积分已计入余额"
                );
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
