use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::config::Config;
use crate::error::AppError;
use crate::models::User;
use crate::repositories::{EmailVerificationTokenRepository, UserRepository};
use crate::services::EmailClient;
use crate::services::token::{generate_token, hash_token};

/// 再送間隔の下限（秒）
const MIN_INTERVAL_SECS: i64 = 60;
/// 1日あたりの発行上限
const DAILY_LIMIT: i64 = 5;

/// メールアドレス確認サービス
///
/// パスワードリセットと違い、発行上限超過は 429 として明示的に返す
/// （対象は認証済みユーザー自身なので、存在有無を隠す必要がない）。
#[derive(Clone)]
pub struct EmailVerificationService {
    user_repo: UserRepository,
    token_repo: EmailVerificationTokenRepository,
    email_client: EmailClient,
    config: Arc<Config>,
}

impl EmailVerificationService {
    /// 新しい EmailVerificationService を作成
    pub fn new(
        user_repo: UserRepository,
        token_repo: EmailVerificationTokenRepository,
        email_client: EmailClient,
        config: Arc<Config>,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            email_client,
            config,
        }
    }

    /// 確認メールの送信をリクエスト
    ///
    /// 発行上限: 1分に1回、1日に5回（発行されたトークン行の created_at で数える。
    /// 無効化されたトークンも発行回数に含まれる）。
    pub async fn request_verification(&self, user: &User) -> Result<(), AppError> {
        let now = OffsetDateTime::now_utc();

        let recent = self
            .token_repo
            .count_for_user_since(user.id, now - Duration::seconds(MIN_INTERVAL_SECS))
            .await?;
        if recent >= 1 {
            tracing::warn!(user_id = %user.id, "確認メール再送: 間隔が短すぎる");
            return Err(AppError::RateLimited(
                "しばらく待ってから再度お試しください".to_string(),
            ));
        }

        let daily = self
            .token_repo
            .count_for_user_since(user.id, now - Duration::days(1))
            .await?;
        if daily >= DAILY_LIMIT {
            tracing::warn!(user_id = %user.id, daily = daily, "確認メール再送: 1日の上限超過");
            return Err(AppError::RateLimited(
                "本日の送信上限に達しました。明日以降に再度お試しください".to_string(),
            ));
        }

        self.issue_and_send(user).await
    }

    /// トークンを発行して確認メールを送信
    ///
    /// 登録直後の初回送信にも使う（こちらは上限判定を通らない）。
    /// 永続化の失敗は致命的エラー、送信の失敗は配送エラーとして伝播する
    /// （配送に失敗してもトークンは有効なまま残る）。
    pub async fn issue_and_send(&self, user: &User) -> Result<(), AppError> {
        let token = generate_token();
        let token_hash = hash_token(&token);
        let expires_at = OffsetDateTime::now_utc()
            + Duration::seconds(self.config.email_verification_token_ttl_secs);

        self.token_repo.invalidate_active_for_user(user.id).await?;
        let row = self
            .token_repo
            .create(user.id, &token_hash, &user.email, expires_at)
            .await?;

        let verify_url = format!("{}/verify-email?token={}", self.config.public_base_url, token);

        self.email_client
            .send_verification_email(&user.email, &verify_url, &format!("verify-{}", row.id))
            .await?;

        tracing::info!(user_id = %user.id, token_id = %row.id, "確認メール送信完了");

        Ok(())
    }

    /// トークンを検証してメールアドレスを確認済みにする
    ///
    /// 消費は単一の条件付きUPDATE。email_verified_at の設定は一度だけで、
    /// 既に確認済みのユーザーへの再適用は副作用なしの成功として扱う。
    pub async fn verify(&self, token: &str) -> Result<(), AppError> {
        let token_hash = hash_token(token);

        let consumed = self
            .token_repo
            .consume(&token_hash)
            .await?
            .ok_or(AppError::TokenInvalid)?;

        match self.user_repo.mark_email_verified(consumed.user_id).await {
            Ok(true) => {
                tracing::info!(user_id = %consumed.user_id, "メールアドレス確認完了");
            }
            Ok(false) => {
                // 既に確認済み（冪等）
                tracing::info!(user_id = %consumed.user_id, "メールアドレスは確認済み");
            }
            Err(e) => {
                // トークンは既に消費済み。再消費は許さず、再発行を促す
                tracing::error!(
                    error = ?e,
                    token_id = %consumed.id,
                    user_id = %consumed.user_id,
                    "消費済みトークンの確認フラグ更新に失敗"
                );
                return Err(AppError::TokenInvalid);
            }
        }

        Ok(())
    }
}
