//! 端到端集成测试
//!
//! 起一个完整的服务实例（真实数据库 + 进程内 accrual stub +
//! 后台对账任务），通过 HTTP 客户端走完注册 → 上传订单 →
//! 积分入账 → 提现的完整链路。
//! 需要数据库连接，默认跳过：`cargo test -- --ignored`。

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use loyalty_service::accrual::AccrualClient;
use loyalty_service::auth::TokenManager;
use loyalty_service::routes;
use loyalty_service::state::AppState;
use loyalty_service::worker::StatusUpdater;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, broadcast};

// ============================================
// accrual stub
// ============================================

/// 单个订单号在 stub 里的应答计划
enum Plan {
    /// 200 PROCESSED + 指定积分
    Processed(f64),
    /// 503，模拟 accrual 暂时不可用
    Unavailable,
    /// 第一次请求 429 + Retry-After，之后 200 PROCESSED
    RateLimitedThenProcessed {
        retry_after: u64,
        accrual: f64,
        limited: bool,
    },
}

/// 可编程的进程内 accrual 服务
///
/// 未登记的订单号一律应答 204（未注册）。
#[derive(Clone)]
struct StubAccrual {
    plans: Arc<Mutex<HashMap<String, Plan>>>,
}

impl StubAccrual {
    fn new() -> Self {
        Self {
            plans: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn set(&self, number: &str, plan: Plan) {
        self.plans.lock().await.insert(number.to_string(), plan);
    }

    async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/api/orders/{number}", get(stub_order))
            .with_state(self.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }
}

async fn stub_order(State(stub): State<StubAccrual>, Path(number): Path<String>) -> Response {
    let mut plans = stub.plans.lock().await;

    match plans.get_mut(&number) {
        None => StatusCode::NO_CONTENT.into_response(),
        Some(Plan::Unavailable) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        Some(Plan::Processed(accrual)) => axum::Json(serde_json::json!({
            "order": number,
            "status": "PROCESSED",
            "accrual": accrual,
        }))
        .into_response(),
        Some(Plan::RateLimitedThenProcessed {
            retry_after,
            accrual,
            limited,
        }) => {
            if *limited {
                *limited = false;
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [("Retry-After", retry_after.to_string())],
                )
                    .into_response()
            } else {
                axum::Json(serde_json::json!({
                    "order": number,
                    "status": "PROCESSED",
                    "accrual": accrual,
                }))
                .into_response()
            }
        }
    }
}

// ============================================
// 服务实例
// ============================================

struct TestApp {
    base: String,
    client: reqwest::Client,
    shutdown: broadcast::Sender<()>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

/// 起一个完整服务实例；`with_updater` 控制是否启动后台对账任务
async fn spawn_app(accrual_base: &str, with_updater: bool) -> TestApp {
    let storage = common::storage().await;
    let tokens = TokenManager::new("e2e-test-secret");
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    if with_updater {
        let accrual = AccrualClient::new(accrual_base).unwrap();
        let updater = StatusUpdater::new(storage.clone(), accrual);
        tokio::spawn(updater.run(shutdown_tx.subscribe()));
    }

    let app = routes::api_routes(AppState::new(storage, tokens));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        base: format!("http://{}", addr),
        client: reqwest::Client::new(),
        shutdown: shutdown_tx,
    }
}

impl TestApp {
    /// 注册用户并返回完整的 Authorization 头值
    async fn register(&self, login: &str) -> String {
        let response = self
            .client
            .post(format!("{}/api/user/register", self.base))
            .json(&serde_json::json!({"login": login, "password": "pw"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);

        response
            .headers()
            .get("Authorization")
            .expect("注册响应缺少 Authorization 头")
            .to_str()
            .unwrap()
            .to_string()
    }

    async fn upload_order(&self, auth: &str, number: &str) -> u16 {
        self.client
            .post(format!("{}/api/user/orders", self.base))
            .header("Authorization", auth)
            .body(number.to_string())
            .send()
            .await
            .unwrap()
            .status()
            .as_u16()
    }

    async fn balance(&self, auth: &str) -> serde_json::Value {
        let response = self
            .client
            .get(format!("{}/api/user/balance", self.base))
            .header("Authorization", auth)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.unwrap()
    }

    async fn orders(&self, auth: &str) -> reqwest::Response {
        self.client
            .get(format!("{}/api/user/orders", self.base))
            .header("Authorization", auth)
            .send()
            .await
            .unwrap()
    }

    /// 轮询直到余额的 current 达到期望值
    async fn wait_for_current(&self, auth: &str, expected: f64) {
        let deadline = Instant::now() + Duration::from_secs(15);
        loop {
            let balance = self.balance(auth).await;
            if balance["current"] == serde_json::json!(expected) {
                return;
            }
            assert!(
                Instant::now() < deadline,
                "等待余额变为 {expected} 超时，当前: {balance}"
            );
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

// ============================================
// 场景测试
// ============================================

/// 上传订单 → accrual 计算 → 余额入账的完整链路
#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_upload_then_accrual_credits_balance() {
    let stub = StubAccrual::new();
    let accrual_base = stub.spawn().await;
    let app = spawn_app(&accrual_base, true).await;

    let auth = app.register(&common::unique_login("alice")).await;
    let number = common::order_number();
    stub.set(&number, Plan::Processed(123.45)).await;

    assert_eq!(app.upload_order(&auth, &number).await, 202);

    app.wait_for_current(&auth, 123.45).await;
    let balance = app.balance(&auth).await;
    assert_eq!(balance["withdrawn"], serde_json::json!(0.0));

    let orders: serde_json::Value = app.orders(&auth).await.json().await.unwrap();
    let order = orders
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["number"] == serde_json::json!(number))
        .expect("订单应出现在列表里");
    assert_eq!(order["status"], serde_json::json!("PROCESSED"));
    assert_eq!(order["accrual"], serde_json::json!(123.45));
}

/// 订单号归属冲突：本人重复上传 200，他人上传 409
#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_conflicting_upload() {
    let stub = StubAccrual::new();
    let accrual_base = stub.spawn().await;
    let app = spawn_app(&accrual_base, false).await;

    let alice = app.register(&common::unique_login("alice")).await;
    let bob = app.register(&common::unique_login("bob")).await;
    let number = common::order_number();

    assert_eq!(app.upload_order(&alice, &number).await, 202);
    assert_eq!(app.upload_order(&alice, &number).await, 200);
    assert_eq!(app.upload_order(&bob, &number).await, 409);
}

/// 余额不足的提现被拒，余额不变
#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_withdraw_insufficient() {
    let stub = StubAccrual::new();
    let accrual_base = stub.spawn().await;
    let app = spawn_app(&accrual_base, true).await;

    let auth = app.register(&common::unique_login("alice")).await;
    let number = common::order_number();
    stub.set(&number, Plan::Processed(50.0)).await;
    assert_eq!(app.upload_order(&auth, &number).await, 202);
    app.wait_for_current(&auth, 50.0).await;

    let response = app
        .client
        .post(format!("{}/api/user/balance/withdraw", app.base))
        .header("Authorization", &auth)
        .json(&serde_json::json!({"order": "221488416308", "sum": 751}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 402);

    let balance = app.balance(&auth).await;
    assert_eq!(balance["current"], serde_json::json!(50.0));
}

/// 提现成功后余额、累计提现和提现历史一致
#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_withdraw_then_listing() {
    let stub = StubAccrual::new();
    let accrual_base = stub.spawn().await;
    let app = spawn_app(&accrual_base, true).await;

    let auth = app.register(&common::unique_login("alice")).await;
    let number = common::order_number();
    stub.set(&number, Plan::Processed(200.0)).await;
    assert_eq!(app.upload_order(&auth, &number).await, 202);
    app.wait_for_current(&auth, 200.0).await;

    let response = app
        .client
        .post(format!("{}/api/user/balance/withdraw", app.base))
        .header("Authorization", &auth)
        .json(&serde_json::json!({"order": "221488416308", "sum": 150}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let balance = app.balance(&auth).await;
    assert_eq!(balance["current"], serde_json::json!(50.0));
    assert_eq!(balance["withdrawn"], serde_json::json!(150.0));

    let response = app
        .client
        .get(format!("{}/api/user/withdrawals", app.base))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let withdrawals: serde_json::Value = response.json().await.unwrap();
    let list = withdrawals.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["order"], serde_json::json!("221488416308"));
    assert_eq!(list[0]["sum"], serde_json::json!(150.0));
    // RFC3339 UTC
    let processed_at = list[0]["processed_at"].as_str().unwrap();
    assert!(processed_at.ends_with('Z'), "期望 UTC 时间戳: {processed_at}");
}

/// accrual 限流：限流前的批次先落库，等待后继续，最终入账
#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_accrual_rate_limit_backoff() {
    let stub = StubAccrual::new();
    let accrual_base = stub.spawn().await;
    let app = spawn_app(&accrual_base, true).await;

    let auth = app.register(&common::unique_login("alice")).await;

    // first 比 limited 先上传，扫描顺序按上传时间升序：
    // first 进入批次后 limited 触发 429，批次先落库再等待
    let first = common::order_number();
    let limited = common::order_number();
    stub.set(&first, Plan::Processed(10.0)).await;
    stub.set(
        &limited,
        Plan::RateLimitedThenProcessed {
            retry_after: 2,
            accrual: 5.0,
            limited: true,
        },
    )
    .await;

    let started = Instant::now();
    assert_eq!(app.upload_order(&auth, &first).await, 202);
    assert_eq!(app.upload_order(&auth, &limited).await, 202);

    // 限流前的观察结果不等待限流窗口
    app.wait_for_current(&auth, 10.0).await;
    let first_credited = started.elapsed();

    // 两单都入账需要等过限流窗口
    app.wait_for_current(&auth, 15.0).await;
    assert!(
        started.elapsed() >= Duration::from_secs(2),
        "总耗时应不少于 Retry-After 窗口"
    );
    assert!(first_credited <= started.elapsed());
}

/// accrual 暂时不可用时订单保持待处理，恢复后入账且只入一次
#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_transient_accrual_failure_then_recovery() {
    let stub = StubAccrual::new();
    let accrual_base = stub.spawn().await;
    let app = spawn_app(&accrual_base, true).await;

    let auth = app.register(&common::unique_login("alice")).await;
    let number = common::order_number();
    stub.set(&number, Plan::Unavailable).await;
    assert_eq!(app.upload_order(&auth, &number).await, 202);

    // 多轮扫描之后订单仍是 NEW，余额为零
    tokio::time::sleep(Duration::from_secs(1)).await;
    let orders: serde_json::Value = app.orders(&auth).await.json().await.unwrap();
    assert_eq!(orders[0]["status"], serde_json::json!("NEW"));
    let balance = app.balance(&auth).await;
    assert_eq!(balance["current"], serde_json::json!(0.0));

    // 恢复后入账；再给对账任务几轮扫描时间，确认没有二次入账
    stub.set(&number, Plan::Processed(123.45)).await;
    app.wait_for_current(&auth, 123.45).await;

    tokio::time::sleep(Duration::from_secs(1)).await;
    let balance = app.balance(&auth).await;
    assert_eq!(balance["current"], serde_json::json!(123.45));
}

// ============================================
// 边界与错误路径
// ============================================

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_auth_error_paths() {
    let stub = StubAccrual::new();
    let accrual_base = stub.spawn().await;
    let app = spawn_app(&accrual_base, false).await;

    let login = common::unique_login("alice");
    let _auth = app.register(&login).await;

    // 重复注册 409
    let response = app
        .client
        .post(format!("{}/api/user/register", app.base))
        .json(&serde_json::json!({"login": login, "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // 空登录名 400
    let response = app
        .client
        .post(format!("{}/api/user/register", app.base))
        .json(&serde_json::json!({"login": "", "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // 非法 JSON 400
    let response = app
        .client
        .post(format!("{}/api/user/register", app.base))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // 密码错误 401
    let response = app
        .client
        .post(format!("{}/api/user/login", app.base))
        .json(&serde_json::json!({"login": login, "password": "wrong"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
    assert_eq!(response.text().await.unwrap(), "auth credentials are invalid");

    // 未知登录名 401
    let response = app
        .client
        .post(format!("{}/api/user/login", app.base))
        .json(&serde_json::json!({"login": common::unique_login("ghost"), "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // 正确口令登录 200 + Bearer 头
    let response = app
        .client
        .post(format!("{}/api/user/login", app.base))
        .json(&serde_json::json!({"login": login, "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let header = response.headers().get("Authorization").unwrap().to_str().unwrap();
    assert!(header.starts_with("Bearer "));

    // 无 token 访问受保护路由 401
    let response = app
        .client
        .get(format!("{}/api/user/balance", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_validation_and_empty_list_paths() {
    let stub = StubAccrual::new();
    let accrual_base = stub.spawn().await;
    let app = spawn_app(&accrual_base, false).await;

    let auth = app.register(&common::unique_login("alice")).await;

    // Luhn 校验失败 422
    assert_eq!(app.upload_order(&auth, "1234").await, 422);
    assert_eq!(app.upload_order(&auth, "not-a-number").await, 422);

    // 提现订单号 Luhn 校验失败 422
    let response = app
        .client
        .post(format!("{}/api/user/balance/withdraw", app.base))
        .header("Authorization", &auth)
        .json(&serde_json::json!({"order": "1234", "sum": 10}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);

    // 非正提现金额 422
    let response = app
        .client
        .post(format!("{}/api/user/balance/withdraw", app.base))
        .header("Authorization", &auth)
        .json(&serde_json::json!({"order": "221488416308", "sum": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);

    // 空列表 204，响应体为空
    let response = app.orders(&auth).await;
    assert_eq!(response.status().as_u16(), 204);
    assert!(response.text().await.unwrap().is_empty());

    let response = app
        .client
        .get(format!("{}/api/user/withdrawals", app.base))
        .header("Authorization", &auth)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    // 新用户余额为零
    let balance = app.balance(&auth).await;
    assert_eq!(balance["current"], serde_json::json!(0.0));
    assert_eq!(balance["withdrawn"], serde_json::json!(0.0));
}
