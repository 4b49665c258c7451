//! 余额与提现处理器

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use super::with_timeout;
use crate::error::{AppError, Result};
use crate::luhn;
use crate::middleware::CurrentUser;
use crate::models::Balance;
use crate::state::AppState;

/// 提现请求体
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub order: String,
    pub sum: Decimal,
}

/// 查询余额
///
/// GET /api/user/balance
pub async fn get_user_balance(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Balance>> {
    let balance = with_timeout(state.storage.get_user_balance(user.id)).await?;

    Ok(Json(balance))
}

/// 积分提现
///
/// POST /api/user/balance/withdraw，请求体 `{order, sum}`。
/// 提现针对的订单号只需通过 Luhn 校验，不要求属于当前用户。
/// 余额不足 402。
pub async fn withdraw_bonuses(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: std::result::Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let Json(request) =
        payload.map_err(|e| AppError::Internal(format!("请求体解析失败: {}", e)))?;

    if !luhn::is_valid(&request.order) {
        return Err(AppError::InvalidOrderNumber(request.order));
    }
    if request.sum <= Decimal::ZERO {
        return Err(AppError::InvalidWithdrawSum);
    }

    with_timeout(
        state
            .storage
            .withdraw_user(user.id, &request.order, request.sum),
    )
    .await?;

    info!(user_id = %user.id, order = %request.order, sum = %request.sum, "提现成功");
    Ok(StatusCode::OK)
}
