//! 路由配置模块
//!
//! 注册和登录是公开路由；其余路由经过 token 中间件。

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};

use crate::handlers;
use crate::middleware::token_middleware;
use crate::state::AppState;

/// 构建完整的 API 路由
pub fn api_routes(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/user/register", post(handlers::auth::register))
        .route("/api/user/login", post(handlers::auth::login));

    let protected = Router::new()
        .route(
            "/api/user/orders",
            post(handlers::orders::upload_order).get(handlers::orders::get_user_orders),
        )
        .route(
            "/api/user/balance",
            get(handlers::balance::get_user_balance),
        )
        .route(
            "/api/user/balance/withdraw",
            post(handlers::balance::withdraw_bonuses),
        )
        .route(
            "/api/user/withdrawals",
            get(handlers::withdrawals::get_user_withdrawals),
        )
        .route_layer(from_fn_with_state(state.clone(), token_middleware));

    public.merge(protected).with_state(state)
}
