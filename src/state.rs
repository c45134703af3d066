use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::repositories::{
    EmailVerificationTokenRepository, PasswordResetTokenRepository, ResetRequestLogRepository,
    SessionRepository, UserRepository,
};
use crate::services::{
    AuthService, EmailClient, EmailVerificationService, PasswordResetService, ResetRateLimiter,
};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL コネクションプール
    pub db_pool: PgPool,
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// ユーザーリポジトリ
    pub user_repo: UserRepository,
    /// 認証サービス（パスワード認証・Bearer セッション）
    pub auth_service: AuthService,
    /// パスワードリセットサービス
    pub password_reset_service: PasswordResetService,
    /// メールアドレス確認サービス
    pub email_verification_service: EmailVerificationService,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(db_pool: PgPool, config: Config) -> Self {
        let config = Arc::new(config);

        let user_repo = UserRepository::new(db_pool.clone());
        let session_repo = SessionRepository::new(db_pool.clone());
        let reset_token_repo = PasswordResetTokenRepository::new(db_pool.clone());
        let verification_token_repo = EmailVerificationTokenRepository::new(db_pool.clone());
        let reset_log_repo = ResetRequestLogRepository::new(db_pool.clone());

        let email_client = EmailClient::new(config.clone());
        let rate_limiter = ResetRateLimiter::new(reset_log_repo);

        let auth_service =
            AuthService::new(user_repo.clone(), session_repo, config.session_ttl_secs);

        let password_reset_service = PasswordResetService::new(
            user_repo.clone(),
            reset_token_repo,
            rate_limiter,
            email_client.clone(),
            config.clone(),
        );

        let email_verification_service = EmailVerificationService::new(
            user_repo.clone(),
            verification_token_repo,
            email_client,
            config.clone(),
        );

        Self {
            db_pool,
            config,
            user_repo,
            auth_service,
            password_reset_service,
            email_verification_service,
        }
    }
}
