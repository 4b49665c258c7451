//! Bearer token 中间件
//!
//! 解析 `Authorization: Bearer <token>`，把解析结果作为
//! `AuthStatus` 写入请求扩展。中间件本身不拒绝请求 ——
//! 由下游 handler 的 `CurrentUser` 提取器决定 401 响应体，
//! 这样公共路由和受保护路由可以共用同一套类型。

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::{Request, header, request::Parts};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;
use uuid::Uuid;

use crate::auth::token::TokenError;
use crate::error::AppError;
use crate::state::AppState;

/// 请求的认证结果
#[derive(Debug, Clone, Copy)]
pub enum AuthStatus {
    /// token 有效，携带用户 id
    Authenticated(Uuid),
    /// 没有 Authorization 头
    Missing,
    /// 头格式错误、签名无效或载荷损坏
    Malformed,
    /// token 已过期
    Expired,
}

/// token 解析中间件
pub async fn token_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let status = match header_value {
        None => AuthStatus::Missing,
        Some(value) => match value.strip_prefix("Bearer ") {
            None => AuthStatus::Malformed,
            Some(token) => match state.tokens.verify(token) {
                Ok(user_id) => AuthStatus::Authenticated(user_id),
                Err(TokenError::Expired) => AuthStatus::Expired,
                Err(e) => {
                    debug!(error = %e, "token 校验失败");
                    AuthStatus::Malformed
                }
            },
        },
    };

    request.extensions_mut().insert(status);
    next.run(request).await
}

/// 已认证用户提取器
///
/// 从请求扩展里读取中间件写入的 `AuthStatus`；未认证时直接
/// 生成 401 响应（过期与无效分别使用契约规定的响应体）。
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: Uuid,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthStatus>() {
            Some(AuthStatus::Authenticated(user_id)) => Ok(CurrentUser { id: *user_id }),
            Some(AuthStatus::Expired) => Err(AppError::TokenExpired),
            _ => Err(AppError::InvalidAuth),
        }
    }
}
