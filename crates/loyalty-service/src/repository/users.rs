//! 用户存储操作

use tracing::info;

use super::storage::{Storage, is_unique_violation};
use crate::error::{AppError, Result};
use crate::models::User;

impl Storage {
    /// 创建用户
    ///
    /// 用户行、积分余额行和累计提现行在同一事务里建立，
    /// 余额从 (0, 0) 起步。登录名唯一冲突返回 `LoginExists`。
    pub async fn create_user(&self, user: &User) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO users (id, login, password_hash) VALUES ($1, $2, $3)",
        )
        .bind(user.id)
        .bind(&user.login)
        .bind(&user.password_hash)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if is_unique_violation(&e) {
                return Err(AppError::LoginExists);
            }
            return Err(e.into());
        }

        sqlx::query("INSERT INTO balance (user_id, current) VALUES ($1, 0)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO withdrawn_balance (user_id, withdrawn) VALUES ($1, 0)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(user_id = %user.id, login = %user.login, "用户已创建");
        Ok(())
    }

    /// 按登录名查找用户
    pub async fn get_user(&self, login: &str) -> Result<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, login, password_hash FROM users WHERE login = $1",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::LoginNotFound)
    }
}
