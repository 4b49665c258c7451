//! 存储层入口

use sqlx::PgPool;

/// 存储层统一入口
///
/// 连接池内部共享，可以廉价克隆给 handler 和后台任务。
#[derive(Clone)]
pub struct Storage {
    pub(crate) pool: PgPool,
}

impl Storage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// 判断 sqlx 错误是否为唯一约束冲突
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
