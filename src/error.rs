use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("認証エラー: {0}")]
    Authentication(String),

    #[error("認証が必要です")]
    Unauthorized,

    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),

    #[error("このメールアドレスは既に使用されています")]
    EmailAlreadyExists,

    /// 不正・期限切れ・使用済みトークンをまとめた汎用エラー
    ///
    /// 存在有無・期限切れ・使用済みを区別して返すと列挙攻撃の材料になるため、
    /// クライアントには常に同一メッセージを返す。
    #[error("無効または期限切れのリンクです")]
    TokenInvalid,

    #[error("メールアドレスの確認が必要です")]
    EmailNotVerified,

    /// メール確認の再送上限超過（こちらは 429 を明示的に返す）
    ///
    /// パスワードリセットの超過は汎用成功レスポンスに畳み込まれるため、
    /// この型には乗らない。
    #[error("リクエストが多すぎます: {0}")]
    RateLimited(String),

    /// メール配送エラー（トークンエラーとは別系統）
    ///
    /// 配送失敗はトークン発行をロールバックしない。
    #[error("メール送信エラー: {0}")]
    EmailDelivery(String),
}

/// クライアント向けの安定したエラー形
///
/// 成功レスポンスと同じく本文は `message` に載せる（`{ok:false, message}`）
#[derive(Serialize)]
struct ErrorResponse {
    ok: bool,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "メールアドレスまたはパスワードが正しくありません".to_string(),
            ),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "認証が必要です".to_string()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::EmailAlreadyExists => (
                StatusCode::CONFLICT,
                "このメールアドレスは既に使用されています".to_string(),
            ),
            Self::TokenInvalid => (
                StatusCode::BAD_REQUEST,
                "無効または期限切れのリンクです".to_string(),
            ),
            Self::EmailNotVerified => (
                StatusCode::FORBIDDEN,
                "メールアドレスの確認が必要です".to_string(),
            ),
            Self::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.clone()),
            Self::EmailDelivery(e) => {
                tracing::error!(error = %e, "メール配送エラー");
                (
                    StatusCode::BAD_GATEWAY,
                    "メールの送信に失敗しました。時間をおいて再度お試しください".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { ok: false, message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_rate_limited_body_uses_message_field() {
        let response =
            AppError::RateLimited("しばらく待ってから再度お試しください".to_string())
                .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("\"message\""));
        assert!(!body.contains("\"error\""));
        assert!(body.contains("\"ok\":false"));
    }

    #[tokio::test]
    async fn test_token_invalid_maps_to_400_with_generic_message() {
        let response = AppError::TokenInvalid.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("無効または期限切れのリンクです"));
    }
}
