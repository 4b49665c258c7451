//! 服务错误类型定义
//!
//! 所有业务和存储错误统一为一个枚举，在 HTTP 边界上一次性
//! 转换为状态码。4xx 响应体只携带简短常量，内部细节只进日志。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::token::TokenError;

/// 服务错误类型
#[derive(Debug, Error)]
pub enum AppError {
    // 认证错误
    #[error("token has expired")]
    TokenExpired,
    #[error("auth credentials are invalid")]
    InvalidAuth,
    #[error("登录名不存在")]
    LoginNotFound,

    // 校验错误
    #[error("参数验证失败: {0}")]
    Validation(String),
    #[error("订单号校验失败: {0}")]
    InvalidOrderNumber(String),
    #[error("提现金额必须为正数")]
    InvalidWithdrawSum,

    // 业务冲突
    #[error("登录名已被占用")]
    LoginExists,
    #[error("订单号已存在")]
    OrderNumberExists(Uuid),
    #[error("订单号已被提现使用")]
    WithdrawalExists,
    #[error("积分余额不足")]
    NotEnoughSum,

    // 空结果，对外表现为 204
    #[error("用户没有订单")]
    OrderForUserNotFound,
    #[error("用户没有提现记录")]
    WithdrawalsForUserNotFound,

    // 仅后台对账任务使用，不会到达 HTTP 边界
    #[error("没有待更新的订单")]
    OrdersForUpdateNotFound,

    // 系统错误
    #[error("存储操作超时")]
    StorageTimeout,
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TokenExpired | Self::InvalidAuth | Self::LoginNotFound => {
                StatusCode::UNAUTHORIZED
            }

            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidOrderNumber(_) | Self::InvalidWithdrawSum => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            Self::LoginExists | Self::OrderNumberExists(_) | Self::WithdrawalExists => {
                StatusCode::CONFLICT
            }
            Self::NotEnoughSum => StatusCode::PAYMENT_REQUIRED,

            Self::OrderForUserNotFound | Self::WithdrawalsForUserNotFound => {
                StatusCode::NO_CONTENT
            }

            Self::OrdersForUpdateNotFound
            | Self::StorageTimeout
            | Self::Database(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 空列表不是错误，响应体为空
        if status == StatusCode::NO_CONTENT {
            return status.into_response();
        }

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "internal server error".to_string()
            }
            Self::StorageTimeout => {
                tracing::error!("存储操作超时");
                "internal server error".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "internal server error".to_string()
            }
            Self::OrdersForUpdateNotFound => "internal server error".to_string(),
            other => other.to_string(),
        };

        (status, message).into_response()
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::TokenExpired,
            TokenError::Invalid(_) => Self::InvalidAuth,
            TokenError::Issue(msg) => Self::Internal(msg),
        }
    }
}
