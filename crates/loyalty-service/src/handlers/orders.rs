//! 订单处理器

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, info};

use super::with_timeout;
use crate::error::{AppError, Result};
use crate::luhn;
use crate::middleware::CurrentUser;
use crate::models::Order;
use crate::state::AppState;

/// 上传订单号
///
/// POST /api/user/orders，请求体为裸的订单号字符串。
/// 新订单 202；本人重复上传 200；已被他人占用 409；
/// Luhn 校验失败 422。
pub async fn upload_order(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Bytes,
) -> Result<Response> {
    let number = String::from_utf8(body.to_vec())
        .map_err(|_| AppError::Internal("请求体不是合法 UTF-8".to_string()))?;

    if !luhn::is_valid(&number) {
        return Err(AppError::InvalidOrderNumber(number));
    }

    match with_timeout(state.storage.upload_order(user.id, &number)).await {
        Ok(()) => {
            info!(user_id = %user.id, number = %number, "订单号已登记");
            Ok(StatusCode::ACCEPTED.into_response())
        }
        Err(AppError::OrderNumberExists(owner)) if owner == user.id => {
            debug!(user_id = %user.id, number = %number, "本人重复上传订单号");
            Ok(StatusCode::OK.into_response())
        }
        Err(AppError::OrderNumberExists(owner)) => {
            info!(
                user_id = %user.id,
                owner_id = %owner,
                number = %number,
                "订单号已被其他用户占用"
            );
            Ok(StatusCode::CONFLICT.into_response())
        }
        Err(e) => Err(e),
    }
}

/// 用户订单列表，最新的在前
///
/// GET /api/user/orders；无订单时 204。
pub async fn get_user_orders(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Order>>> {
    let orders = with_timeout(state.storage.get_user_orders(user.id)).await?;

    Ok(Json(orders))
}
