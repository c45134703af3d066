use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::handlers::password_reset::GenericResponse;
use crate::state::AppState;

// === 確認メールの再送 ===

/// POST /api/email/verification-request
///
/// Bearer 認証必須。対象ユーザーはトークンから解決し、
/// クライアントから渡されたIDは一切使わない。
/// 再送上限（1分に1回、1日に5回）超過は 429 を明示的に返す。
pub async fn request_email_verification(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<GenericResponse>, AppError> {
    let user = state.auth_service.current_user(&headers).await?;

    // 既に確認済みなら発行も送信もしない（冪等な成功）
    if user.is_email_verified() {
        return Ok(Json(GenericResponse {
            ok: true,
            message: "メールアドレスは確認済みです".to_string(),
        }));
    }

    state
        .email_verification_service
        .request_verification(&user)
        .await?;

    Ok(Json(GenericResponse {
        ok: true,
        message: "確認メールを送信しました".to_string(),
    }))
}

// === メールアドレス確認 ===

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// GET /api/email/verify?token=...
///
/// メール内リンクからの遷移用。トークンはクエリ文字列で受け取る。
pub async fn verify_email_get(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<GenericResponse>, AppError> {
    let token = query.token.unwrap_or_default();
    verify_email_inner(&state, &token).await
}

/// POST /api/email/verify
///
/// フロントエンドからの呼び出し用。トークンはJSONボディで受け取る。
pub async fn verify_email_post(
    State(state): State<AppState>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<Json<GenericResponse>, AppError> {
    verify_email_inner(&state, &request.token).await
}

async fn verify_email_inner(
    state: &AppState,
    token: &str,
) -> Result<Json<GenericResponse>, AppError> {
    validate_token(token)?;

    state.email_verification_service.verify(token).await?;

    Ok(Json(GenericResponse {
        ok: true,
        message: "メールアドレスを確認しました".to_string(),
    }))
}

/// トークンのバリデーション
fn validate_token(token: &str) -> Result<(), AppError> {
    if token.trim().is_empty() {
        return Err(AppError::Validation("トークンは必須です".to_string()));
    }
    Ok(())
}
