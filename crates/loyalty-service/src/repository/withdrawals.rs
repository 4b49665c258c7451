//! 提现存储操作

use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use super::storage::{Storage, is_unique_violation};
use crate::error::{AppError, Result};
use crate::models::Withdrawal;

impl Storage {
    /// 提现
    ///
    /// 单个事务内：锁住余额行 → 余额不足返回 `NotEnoughSum` →
    /// 写提现记录和归属边 → 扣减余额、累加已提现。余额行的排它
    /// 锁把同一用户的所有资金变动串行化，并发提现不可能透支。
    pub async fn withdraw_user(
        &self,
        user_id: Uuid,
        order_number: &str,
        sum: Decimal,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let (current,): (Decimal,) =
            sqlx::query_as("SELECT current FROM balance WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

        if current < sum {
            tx.rollback().await?;
            return Err(AppError::NotEnoughSum);
        }

        let inserted = sqlx::query("INSERT INTO withdrawals (order_number, sum) VALUES ($1, $2)")
            .bind(order_number)
            .bind(sum)
            .execute(&mut *tx)
            .await;

        if let Err(e) = inserted {
            if is_unique_violation(&e) {
                return Err(AppError::WithdrawalExists);
            }
            return Err(e.into());
        }

        sqlx::query("INSERT INTO users_withdrawals (order_number, user_id) VALUES ($1, $2)")
            .bind(order_number)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE balance SET current = current - $1 WHERE user_id = $2")
            .bind(sum)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE withdrawn_balance SET withdrawn = withdrawn + $1 WHERE user_id = $2")
            .bind(sum)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(user_id = %user_id, order_number = %order_number, sum = %sum, "积分已提现");
        Ok(())
    }

    /// 用户提现历史，按处理时间升序
    pub async fn get_user_withdrawals(&self, user_id: Uuid) -> Result<Vec<Withdrawal>> {
        let withdrawals = sqlx::query_as::<_, Withdrawal>(
            "SELECT w.order_number, w.sum, w.processed_at \
             FROM withdrawals w \
             JOIN users_withdrawals uw ON uw.order_number = w.order_number \
             WHERE uw.user_id = $1 \
             ORDER BY w.processed_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if withdrawals.is_empty() {
            return Err(AppError::WithdrawalsForUserNotFound);
        }

        Ok(withdrawals)
    }
}
