//! 提现历史处理器

use axum::Json;
use axum::extract::State;

use super::with_timeout;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::Withdrawal;
use crate::state::AppState;

/// 提现历史，按处理时间升序
///
/// GET /api/user/withdrawals；无记录时 204。
pub async fn get_user_withdrawals(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Withdrawal>>> {
    let withdrawals = with_timeout(state.storage.get_user_withdrawals(user.id)).await?;

    Ok(Json(withdrawals))
}
