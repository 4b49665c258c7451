//! 余额存储操作

use uuid::Uuid;

use super::storage::Storage;
use crate::error::Result;
use crate::models::Balance;

impl Storage {
    /// 读取用户余额（当前可用 + 累计已提现）
    ///
    /// 两行都在用户注册时建立，读取不加锁：读者看到的总是某次
    /// 已提交事务的完整结果。
    pub async fn get_user_balance(&self, user_id: Uuid) -> Result<Balance> {
        let balance = sqlx::query_as::<_, Balance>(
            "SELECT b.current, wb.withdrawn \
             FROM balance b \
             JOIN withdrawn_balance wb ON wb.user_id = b.user_id \
             WHERE b.user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(balance)
    }
}
