//! 应用状态定义

use crate::auth::TokenManager;
use crate::repository::Storage;

/// Axum 应用共享状态
///
/// handler 间共享存储入口和 token 管理器，两者内部都只是
/// 廉价克隆的句柄。
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub tokens: TokenManager,
}

impl AppState {
    pub fn new(storage: Storage, tokens: TokenManager) -> Self {
        Self { storage, tokens }
    }
}
