use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::EmailVerificationToken;

#[derive(Clone)]
pub struct EmailVerificationTokenRepository {
    pool: PgPool,
}

impl EmailVerificationTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 新しいメール確認トークンを作成
    pub async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        sent_to_email: &str,
        expires_at: OffsetDateTime,
    ) -> Result<EmailVerificationToken, sqlx::Error> {
        sqlx::query_as::<_, EmailVerificationToken>(
            r#"
            INSERT INTO email_verification_tokens (user_id, token_hash, sent_to_email, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token_hash, sent_to_email, expires_at, consumed_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(sent_to_email)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
    }

    /// トークンを消費（単回使用の本体）
    ///
    /// パスワードリセットトークンと同じく、検索と consumed_at の設定を
    /// 単一の条件付きUPDATEで行う。
    pub async fn consume(
        &self,
        token_hash: &str,
    ) -> Result<Option<EmailVerificationToken>, sqlx::Error> {
        sqlx::query_as::<_, EmailVerificationToken>(
            r#"
            UPDATE email_verification_tokens
            SET consumed_at = NOW()
            WHERE token_hash = $1
              AND consumed_at IS NULL
              AND expires_at > NOW()
            RETURNING id, user_id, token_hash, sent_to_email, expires_at, consumed_at, created_at
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
    }

    /// 対象ユーザーの未使用トークンをすべて無効化
    pub async fn invalidate_active_for_user(&self, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE email_verification_tokens
            SET consumed_at = NOW()
            WHERE user_id = $1 AND consumed_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// 指定時刻以降に発行されたトークン数を数える
    ///
    /// 発行回数上限（1分に1回、1日に5回）の判定に使用する。
    /// 無効化済みのトークンも発行回数には含める（created_at で数える）。
    pub async fn count_for_user_since(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM email_verification_tokens
            WHERE user_id = $1 AND created_at >= $2
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
    }

    /// 期限切れトークンを削除
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM email_verification_tokens
            WHERE expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
