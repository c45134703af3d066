use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// ログインリクエスト
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// ログインレスポンス
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub ok: bool,
    /// Bearer セッショントークン（平文はこのレスポンスにのみ現れる）
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user_id: Uuid,
    pub email: String,
    pub email_verified: bool,
}

/// ログインハンドラー
///
/// POST /api/login
///
/// 処理フロー:
/// 1. リクエストバリデーション
/// 2. ユーザー認証（DB照合、タイミング攻撃対策込み）
/// 3. メール確認ゲート（REQUIRE_VERIFIED_LOGIN 有効時のみ）
/// 4. セッション発行、Bearer トークンを返却
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    // 1. リクエストバリデーション
    validate_login_request(&request)?;

    // 2. ユーザー認証
    let user = state
        .auth_service
        .authenticate(&request.email, &request.password)
        .await?;

    // 3. メール確認ゲート
    if state.config.require_verified_login && !user.is_email_verified() {
        tracing::warn!(user_id = %user.id, "ログイン拒否: メールアドレス未確認");
        return Err(AppError::EmailNotVerified);
    }

    // 4. セッション発行
    let (token, expires_at) = state.auth_service.create_session(user.id).await?;

    tracing::info!(user_id = %user.id, "ログイン成功");

    let email_verified = user.is_email_verified();

    Ok(Json(LoginResponse {
        ok: true,
        token,
        expires_at,
        user_id: user.id,
        email: user.email,
        email_verified,
    }))
}

/// ログインリクエストのバリデーション
fn validate_login_request(request: &LoginRequest) -> Result<(), AppError> {
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("メールアドレスは必須です".to_string()));
    }
    if request.password.is_empty() {
        return Err(AppError::Validation("パスワードは必須です".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_empty_email() {
        let request = LoginRequest {
            email: "".to_string(),
            password: "password123".to_string(),
        };
        assert!(validate_login_request(&request).is_err());
    }

    #[test]
    fn test_validate_empty_password() {
        let request = LoginRequest {
            email: "test@example.com".to_string(),
            password: "".to_string(),
        };
        assert!(validate_login_request(&request).is_err());
    }

    #[test]
    fn test_validate_valid_request() {
        let request = LoginRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(validate_login_request(&request).is_ok());
    }
}
