use std::net::{IpAddr, SocketAddr};

use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GenericResponse {
    pub ok: bool,
    pub message: String,
}

// === リセットリクエスト ===

#[derive(Debug, Deserialize)]
pub struct ResetRequestRequest {
    pub email: String,
}

/// POST /api/password/reset-request
///
/// # Security
/// 常に同一の汎用成功レスポンスを返す。ユーザー不在・レート制限超過・
/// メール送信失敗のどれであっても、レスポンスの形・内容は変わらない
/// （メールアドレスの存在有無を漏らさない）。
pub async fn request_password_reset(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<ResetRequestRequest>,
) -> Result<Json<GenericResponse>, AppError> {
    // バリデーション
    validate_email(&request.email)?;

    let ip = client_ip(&headers, addr.ip(), state.config.trust_forwarded_for);

    state
        .password_reset_service
        .request_reset(&request.email, ip)
        .await?;

    Ok(Json(GenericResponse {
        ok: true,
        message: "アカウントが存在する場合、パスワードリセット手順をメールで送信しました"
            .to_string(),
    }))
}

// === パスワードリセット実行 ===

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
}

/// POST /api/password/reset
///
/// パスワードのバリデーションはトークン消費の前に行う
/// （入力不備でトークンを無駄に消費しない）。
///
/// # Security
/// - token, password はログに出力しない
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<GenericResponse>, AppError> {
    // バリデーション（トークン消費より先）
    validate_reset_password_request(&request)?;

    state
        .password_reset_service
        .reset_password(&request.token, &request.password)
        .await?;

    Ok(Json(GenericResponse {
        ok: true,
        message: "パスワードが更新されました".to_string(),
    }))
}

/// クライアントIPを決定
///
/// X-Forwarded-For は TRUST_FORWARDED_FOR 有効時のみ参照する（先頭エントリ）。
/// 無効時・パース不能時は接続元ソケットのアドレスを使う。ヘッダーを無条件に
/// 信頼すると、直接アクセスのクライアントが自称IPを変えるだけで
/// IPバケットのレート制限を回避できてしまう。
fn client_ip(headers: &HeaderMap, socket_ip: IpAddr, trust_forwarded: bool) -> Option<IpAddr> {
    if trust_forwarded {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());

        if forwarded.is_some() {
            return forwarded;
        }
    }

    Some(socket_ip)
}

/// メールアドレスのバリデーション
fn validate_email(email: &str) -> Result<(), AppError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "有効なメールアドレスを入力してください".to_string(),
        ));
    }
    Ok(())
}

/// リセットパスワードリクエストのバリデーション
fn validate_reset_password_request(request: &ResetPasswordRequest) -> Result<(), AppError> {
    if request.token.trim().is_empty() {
        return Err(AppError::Validation("トークンは必須です".to_string()));
    }
    if request.password.len() < 8 {
        return Err(AppError::Validation(
            "パスワードは8文字以上で入力してください".to_string(),
        ));
    }
    if request.password != request.confirm_password {
        return Err(AppError::Validation(
            "パスワードが一致しません".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_validate_empty_email() {
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_invalid_email() {
        assert!(validate_email("invalid-email").is_err());
    }

    #[test]
    fn test_validate_valid_email() {
        assert!(validate_email("test@example.com").is_ok());
    }

    fn reset_request(token: &str, password: &str, confirm: &str) -> ResetPasswordRequest {
        ResetPasswordRequest {
            token: token.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_validate_empty_token() {
        let request = reset_request("", "password123", "password123");
        assert!(validate_reset_password_request(&request).is_err());
    }

    #[test]
    fn test_validate_short_password() {
        let request = reset_request("valid-token", "short", "short");
        assert!(validate_reset_password_request(&request).is_err());
    }

    #[test]
    fn test_validate_password_mismatch() {
        let request = reset_request("valid-token", "password123", "password124");
        assert!(validate_reset_password_request(&request).is_err());
    }

    #[test]
    fn test_validate_valid_reset_request() {
        let request = reset_request("valid-token", "password123", "password123");
        assert!(validate_reset_password_request(&request).is_ok());
    }

    #[test]
    fn test_client_ip_from_forwarded_header_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let ip = client_ip(&headers, "127.0.0.1".parse().unwrap(), true);
        assert_eq!(ip, Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_client_ip_ignores_forwarded_when_untrusted() {
        // プロキシ設定なしではヘッダー偽装でIPバケットを変えられない
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7"),
        );
        let ip = client_ip(&headers, "192.0.2.1".parse().unwrap(), false);
        assert_eq!(ip, Some("192.0.2.1".parse().unwrap()));
    }

    #[test]
    fn test_client_ip_fallback_to_socket() {
        let headers = HeaderMap::new();
        let ip = client_ip(&headers, "192.0.2.1".parse().unwrap(), true);
        assert_eq!(ip, Some("192.0.2.1".parse().unwrap()));
    }

    #[test]
    fn test_client_ip_invalid_forwarded_falls_back() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        let ip = client_ip(&headers, "192.0.2.1".parse().unwrap(), true);
        assert_eq!(ip, Some("192.0.2.1".parse().unwrap()));
    }
}
