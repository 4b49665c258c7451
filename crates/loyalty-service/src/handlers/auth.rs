//! 注册与登录处理器
//!
//! 成功响应通过 `Authorization: Bearer <token>` 头返回会话凭证，
//! 响应体为空。

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::with_timeout;
use crate::auth::{hash_password, verify_password};
use crate::error::{AppError, Result};
use crate::models::User;
use crate::state::AppState;

/// 注册 / 登录请求体
#[derive(Debug, Deserialize, Validate)]
pub struct Credentials {
    #[validate(length(min = 1, message = "登录名不能为空"))]
    pub login: String,
    #[validate(length(min = 1, message = "密码不能为空"))]
    pub password: String,
}

/// 用户注册
///
/// POST /api/user/register
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Result<Response> {
    let Json(creds) = payload.map_err(|e| AppError::Validation(e.to_string()))?;
    creds.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let password_hash = hash_password(&creds.password)?;
    let user = User::new(creds.login, password_hash);

    with_timeout(state.storage.create_user(&user)).await?;

    info!(user_id = %user.id, login = %user.login, "新用户已注册");
    bearer_response(&state, user.id)
}

/// 用户登录
///
/// POST /api/user/login
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Result<Response> {
    let Json(creds) = payload.map_err(|e| AppError::Validation(e.to_string()))?;
    creds.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    // 登录名不存在和密码错误对外不区分
    let user = with_timeout(state.storage.get_user(&creds.login))
        .await
        .map_err(|e| match e {
            AppError::LoginNotFound => AppError::InvalidAuth,
            other => other,
        })?;

    if !verify_password(&creds.password, &user.password_hash)? {
        warn!(login = %creds.login, "登录密码错误");
        return Err(AppError::InvalidAuth);
    }

    info!(user_id = %user.id, "用户已登录");
    bearer_response(&state, user.id)
}

/// 构造携带 Bearer token 的 200 响应
fn bearer_response(state: &AppState, user_id: Uuid) -> Result<Response> {
    let token = state.tokens.issue(user_id)?;

    Ok((
        StatusCode::OK,
        [(header::AUTHORIZATION, format!("Bearer {}", token))],
    )
        .into_response())
}
