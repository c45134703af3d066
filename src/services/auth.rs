use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::http::HeaderMap;
use time::{Duration, OffsetDateTime};

use crate::error::AppError;
use crate::models::User;
use crate::repositories::{SessionRepository, UserRepository};
use crate::services::token::{generate_token, hash_token};

/// パスワードをargon2idでハッシュ化
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!(error = ?e, "パスワードハッシュ生成エラー");
            AppError::Internal(anyhow::anyhow!("password hash error"))
        })?;
    Ok(hash.to_string())
}

/// Authorization ヘッダーから Bearer トークンを取り出す
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// 認証サービス
///
/// パスワード認証と Bearer セッションの発行・検証を担当する。
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    session_repo: SessionRepository,
    session_ttl_secs: i64,
}

impl AuthService {
    /// 新しい AuthService を作成
    pub fn new(
        user_repo: UserRepository,
        session_repo: SessionRepository,
        session_ttl_secs: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_ttl_secs,
        }
    }

    /// ユーザー認証を実行
    ///
    /// タイミング攻撃対策: ユーザーが存在しない場合もダミーのパスワード検証を実行
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self.user_repo.find_by_email(email).await?;

        match user {
            Some(user) => {
                if self.verify_password(password, &user.password_hash)? {
                    tracing::info!(user_id = %user.id, "認証成功");
                    Ok(user)
                } else {
                    tracing::warn!(email = %email, "認証失敗: パスワード不一致");
                    Err(AppError::Authentication("invalid_credentials".to_string()))
                }
            }
            None => {
                // タイミング攻撃対策: ユーザーが存在しない場合もダミーのパスワード検証を実行
                // これにより、ユーザーの存在有無を応答時間から推測できなくなる
                let dummy_hash = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$RWh6";
                let _ = self.verify_password(password, dummy_hash);
                tracing::warn!(email = %email, "認証失敗: ユーザー不在");
                Err(AppError::Authentication("invalid_credentials".to_string()))
            }
        }
    }

    /// 新しいセッションを発行
    ///
    /// # Returns
    /// (平文 Bearer トークン, 有効期限)。平文はこの場でのみ存在し、
    /// DBにはハッシュのみ保存される。
    pub async fn create_session(
        &self,
        user_id: uuid::Uuid,
    ) -> Result<(String, OffsetDateTime), AppError> {
        let token = generate_token();
        let token_hash = hash_token(&token);
        let expires_at = OffsetDateTime::now_utc() + Duration::seconds(self.session_ttl_secs);

        self.session_repo
            .create(user_id, &token_hash, expires_at)
            .await?;

        Ok((token, expires_at))
    }

    /// Bearer トークンから現在のユーザーを取得
    ///
    /// ヘッダー不在・形式不正・セッション無効はすべて `Unauthorized` に畳む
    pub async fn current_user(&self, headers: &HeaderMap) -> Result<User, AppError> {
        let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;
        let token_hash = hash_token(token);

        let session = self
            .session_repo
            .find_active_by_token_hash(&token_hash)
            .await?
            .ok_or(AppError::Unauthorized)?;

        self.user_repo
            .find_by_id(session.user_id)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// パスワードを検証
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            tracing::error!(error = ?e, "パスワードハッシュのパースエラー");
            AppError::Internal(anyhow::anyhow!("password hash parse error"))
        })?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_present() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc123"),
        );
        assert_eq!(bearer_token(&headers), Some("abc123"));
    }

    #[test]
    fn test_bearer_token_missing_header() {
        let headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic abc123"),
        );
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_empty_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer   "),
        );
        assert_eq!(bearer_token(&headers), None);
    }

    /// パスワード検証ロジックのユニットテスト
    /// AuthService のインスタンス化には PgPool が必要なため、
    /// argon2 を直接テスト
    #[test]
    fn test_verify_password_logic() {
        let invalid_hash = "invalid_hash_format";
        let parsed = argon2::PasswordHash::new(invalid_hash);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_hash_password_roundtrip() {
        let hash = hash_password("password123").unwrap();
        let parsed = argon2::PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"password123", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"wrong-password", &parsed)
                .is_err()
        );
    }
}
