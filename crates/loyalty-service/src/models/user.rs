//! 用户模型

use sqlx::FromRow;
use uuid::Uuid;

/// 注册用户
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    pub password_hash: String,
}

impl User {
    /// 以新生成的 id 创建用户
    pub fn new(login: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            login,
            password_hash,
        }
    }
}
