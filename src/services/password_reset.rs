use std::net::IpAddr;
use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::config::Config;
use crate::error::AppError;
use crate::repositories::{PasswordResetTokenRepository, UserRepository};
use crate::services::EmailClient;
use crate::services::auth::hash_password;
use crate::services::rate_limit::ResetRateLimiter;
use crate::services::token::{generate_token, hash_identifier, hash_token};

/// パスワードリセットサービス
#[derive(Clone)]
pub struct PasswordResetService {
    user_repo: UserRepository,
    token_repo: PasswordResetTokenRepository,
    rate_limiter: ResetRateLimiter,
    email_client: EmailClient,
    config: Arc<Config>,
}

impl PasswordResetService {
    /// 新しい PasswordResetService を作成
    pub fn new(
        user_repo: UserRepository,
        token_repo: PasswordResetTokenRepository,
        rate_limiter: ResetRateLimiter,
        email_client: EmailClient,
        config: Arc<Config>,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            rate_limiter,
            email_client,
            config,
        }
    }

    /// パスワードリセットをリクエスト
    ///
    /// # Security
    /// 以下のすべてのケースで Ok(()) を返し、レスポンスを同一に保つ:
    /// - ユーザー不在
    /// - レート制限超過（静かにスキップ）
    /// - メール送信失敗（トークンは有効なまま残る）
    /// エラーとして伝播するのはDB障害などの内部エラーのみ。
    /// トークン（平文）はログに出力しない。
    pub async fn request_reset(&self, email: &str, ip: Option<IpAddr>) -> Result<(), AppError> {
        tracing::info!(email = %email, "パスワードリセットリクエスト");

        let email_hash = hash_identifier(email);
        let ip_hash = ip.map(|addr| hash_identifier(&addr.to_string()));

        // レート制限ゲート（判定と記録）
        let allowed = self
            .rate_limiter
            .check_and_record(&email_hash, ip_hash.as_deref())
            .await?;
        if !allowed {
            return Ok(());
        }

        // ユーザー検索（不在でも成功レスポンス）
        let user = match self.user_repo.find_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::info!("パスワードリセット: ユーザー不在（成功レスポンス返却）");
                return Ok(());
            }
        };

        // トークン発行。永続化の失敗はリクエスト全体の失敗
        // （永続化されていないトークンのメールは送らない）
        let token = generate_token();
        let token_hash = hash_token(&token);
        let expires_at = OffsetDateTime::now_utc()
            + Duration::seconds(self.config.password_reset_token_ttl_secs);

        // 有効なトークンは常に1つ: 既存の未使用トークンを先に無効化
        self.token_repo.invalidate_active_for_user(user.id).await?;
        let row = self
            .token_repo
            .create(user.id, &token_hash, &user.email, expires_at)
            .await?;

        let reset_url = format!("{}/reset-password?token={}", self.config.public_base_url, token);

        // 送信失敗はログのみ（汎用成功レスポンスを崩さない。トークンは有効なまま）
        if let Err(e) = self
            .email_client
            .send_password_reset_email(&user.email, &reset_url, &format!("reset-{}", row.id))
            .await
        {
            tracing::error!(error = %e, token_id = %row.id, "リセットメール送信失敗（トークンは有効）");
            return Ok(());
        }

        tracing::info!(user_id = %user.id, token_id = %row.id, "パスワードリセットメール送信完了");

        Ok(())
    }

    /// パスワードをリセット
    ///
    /// トークンの消費は単一の条件付きUPDATE（検索してから更新の二段階は不可）。
    /// 消費後にパスワード更新が失敗した場合、トークンは消費済みのまま
    /// 戻さない。ユーザーには新しいリンクの再発行を促す汎用エラーを返す。
    ///
    /// # Security
    /// トークン・新パスワードはログに出力しない
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        let token_hash = hash_token(token);

        // 原子的に消費。該当なしは不正・期限切れ・使用済みのいずれか
        // （区別せずに同一エラーを返す）
        let consumed = self
            .token_repo
            .consume(&token_hash)
            .await?
            .ok_or(AppError::TokenInvalid)?;

        let password_hash = hash_password(new_password)?;

        if let Err(e) = self
            .user_repo
            .update_password(consumed.user_id, &password_hash)
            .await
        {
            // トークンは既に消費済み。再消費は許さず、再発行を促す
            tracing::error!(
                error = ?e,
                token_id = %consumed.id,
                user_id = %consumed.user_id,
                "消費済みトークンのパスワード更新に失敗"
            );
            return Err(AppError::TokenInvalid);
        }

        tracing::info!(user_id = %consumed.user_id, "パスワードリセット完了");

        // 変更完了の通知。失敗してもリセット自体は成功
        if let Err(e) = self
            .email_client
            .send_password_changed_email(
                &consumed.sent_to_email,
                &format!("reset-confirm-{}", consumed.id),
            )
            .await
        {
            tracing::error!(error = %e, user_id = %consumed.user_id, "変更通知メール送信失敗");
        }

        Ok(())
    }
}
