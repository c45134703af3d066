use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::PasswordResetToken;

#[derive(Clone)]
pub struct PasswordResetTokenRepository {
    pool: PgPool,
}

impl PasswordResetTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 新しいパスワードリセットトークンを作成
    ///
    /// # Arguments
    /// * `user_id` - 対象ユーザーのID
    /// * `token_hash` - トークンのSHA256ハッシュ
    /// * `sent_to_email` - 送信先メールアドレス
    /// * `expires_at` - 有効期限（作成後に延長されない）
    pub async fn create(
        &self,
        user_id: Uuid,
        token_hash: &str,
        sent_to_email: &str,
        expires_at: OffsetDateTime,
    ) -> Result<PasswordResetToken, sqlx::Error> {
        sqlx::query_as::<_, PasswordResetToken>(
            r#"
            INSERT INTO password_reset_tokens (user_id, token_hash, sent_to_email, expires_at)
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
    /// 未使用かつ未期限切れの行をハッシュで検索し、同一の条件付きUPDATEで
    /// consumed_at を設定する。検索してから別文で更新する二段階の実装は
    /// 同時リクエストが両方成功してしまうため禁止。
    ///
    /// # Returns
    /// 消費に成功した場合はトークン行、該当なし（不正・期限切れ・使用済み）
    /// の場合は None
    pub async fn consume(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordResetToken>, sqlx::Error> {
        sqlx::query_as::<_, PasswordResetToken>(
            r#"
            UPDATE password_reset_tokens
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
    ///
    /// 新しいトークンを発行する直前に呼び、「有効なトークンは常に1つ」の
    /// 不変条件を保つ。無効化は consumed_at の設定で表現する。
    ///
    /// # Returns
    /// 無効化された行数
    pub async fn invalidate_active_for_user(&self, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE password_reset_tokens
            SET consumed_at = NOW()
            WHERE user_id = $1 AND consumed_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// 期限切れトークンを削除
    ///
    /// # Returns
    /// 削除された行数
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM password_reset_tokens
            WHERE expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
