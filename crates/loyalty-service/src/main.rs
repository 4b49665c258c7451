//! 积分系统服务入口
//!
//! 初始化顺序：配置 → 日志 → 数据库（含迁移）→ 后台对账任务 →
//! HTTP 服务。任何一步失败都以非零退出码终止进程。

use std::time::Duration;

use loyalty_service::accrual::AccrualClient;
use loyalty_service::auth::TokenManager;
use loyalty_service::repository::Storage;
use loyalty_service::routes;
use loyalty_service::state::AppState;
use loyalty_service::worker::StatusUpdater;
use loyalty_shared::{Config, Database, logging};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// 等待后台任务退出的上限
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    logging::init(&config.log_level)?;

    info!(address = %config.run_address, "starting loyalty service");

    let db = Database::connect(&config.database_uri).await?;
    sqlx::migrate!("./migrations").run(db.pool()).await?;
    info!("database migrations applied");

    // 签名密钥只从环境注入；开发环境允许缺省，但要给出警告
    let token_secret = std::env::var("TOKEN_SECRET").unwrap_or_else(|_| {
        warn!("TOKEN_SECRET 未设置，使用开发默认密钥");
        "loyalty-dev-secret-change-in-production".to_string()
    });

    let storage = Storage::new(db.pool().clone());
    let tokens = TokenManager::new(&token_secret);
    let accrual = AccrualClient::new(&config.accrual_address)?;

    // 后台对账任务：与 HTTP 服务共享存储，通过广播通道接收退出信号
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let updater = StatusUpdater::new(storage.clone(), accrual);
    let updater_handle = tokio::spawn(updater.run(shutdown_tx.subscribe()));

    let app = routes::api_routes(AppState::new(storage, tokens))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.run_address).await?;
    info!("listening on {}", config.run_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // HTTP 已停止，通知对账任务退出；未落库的批次直接丢弃，
    // 对应订单仍是待处理状态，下次启动会重新扫到
    let _ = shutdown_tx.send(());
    if tokio::time::timeout(STOP_TIMEOUT, updater_handle)
        .await
        .is_err()
    {
        error!("等待订单对账任务退出超时");
    }

    db.close().await;
    info!("server shutdown complete");

    Ok(())
}

/// 监听关闭信号（Ctrl+C 或 SIGTERM）
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("注册 Ctrl+C 处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("注册 SIGTERM 处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
