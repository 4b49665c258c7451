//! 会话 token 处理
//!
//! HMAC-SHA256 签名的 JWT，载荷只携带用户 id 和过期时间。
//! 校验时不留任何时钟余量，过期即拒绝。

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// 会话有效期
const TOKEN_TTL_HOURS: i64 = 3;

/// Token 载荷
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    exp: i64,
    #[serde(rename = "UserID")]
    user_id: String,
}

/// Token 错误
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token 已过期")]
    Expired,
    #[error("token 无效: {0}")]
    Invalid(String),
    #[error("token 签发失败: {0}")]
    Issue(String),
}

/// 会话 token 管理器
#[derive(Clone)]
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenManager {
    /// 以签名密钥创建管理器
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// 为用户签发 token，有效期 3 小时
    pub fn issue(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.issue_with_ttl(user_id, Duration::hours(TOKEN_TTL_HOURS))
    }

    pub(crate) fn issue_with_ttl(
        &self,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            exp: (Utc::now() + ttl).timestamp(),
            user_id: user_id.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Issue(e.to_string()))
    }

    /// 校验 token 并取出用户 id
    ///
    /// 区分「已过期」和「格式/签名无效」，调用方据此决定 401 响应体。
    pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        let mut validation = Validation::default();
        // 过期判断不留余量，过期 1 毫秒也拒绝
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;

        Uuid::parse_str(&data.claims.user_id)
            .map_err(|_| TokenError::Invalid("载荷中的用户 id 为空或格式错误".to_string()))
    }
}
