//! 集成测试辅助
//!
//! 所有集成测试都需要一个可用的 PostgreSQL，连接串取自
//! DATABASE_URL；用 `cargo test -- --ignored` 运行。

#![allow(dead_code)]

use loyalty_service::models::User;
use loyalty_service::repository::Storage;
use sqlx::PgPool;
use uuid::Uuid;

/// 连接测试数据库并套用迁移
pub async fn storage() -> Storage {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
    let pool = PgPool::connect(&url).await.expect("数据库连接失败");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("迁移执行失败");

    Storage::new(pool)
}

/// 生成全局唯一的登录名，测试可以重复运行
pub fn unique_login(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

/// 创建一个测试用户并返回其 id
pub async fn create_user(storage: &Storage) -> Uuid {
    let user = User::new(unique_login("user"), "bcrypt-hash-placeholder".to_string());
    storage.create_user(&user).await.expect("创建用户失败");
    user.id
}

/// 生成随机的 Luhn 合法订单号（11 位随机 + 1 位校验）
pub fn order_number() -> String {
    let body: String = Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(11)
        .map(|b| char::from_digit((b % 10) as u32, 10).unwrap())
        .collect();

    format!("{}{}", body, check_digit(&body))
}

/// 计算 Luhn 校验位
fn check_digit(body: &str) -> u32 {
    let mut sum = 0;
    let mut double = true;
    for ch in body.chars().rev() {
        let mut digit = ch.to_digit(10).unwrap();
        if double {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
        double = !double;
    }

    (10 - sum % 10) % 10
}

#[test]
fn test_generated_numbers_pass_luhn() {
    for _ in 0..32 {
        let number = order_number();
        assert!(
            loyalty_service::luhn::is_valid(&number),
            "{number} 应当通过 Luhn 校验"
        );
    }
}
