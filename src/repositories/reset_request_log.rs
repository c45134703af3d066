use sqlx::PgPool;
use time::OffsetDateTime;

use crate::models::ResetRequestLogEntry;

/// パスワードリセットリクエストログのリポジトリ
///
/// 追記と窓集計のみ。更新・削除のメソッドは持たない（追記専用テーブル）。
#[derive(Clone)]
pub struct ResetRequestLogRepository {
    pool: PgPool,
}

impl ResetRequestLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// リクエストを記録
    ///
    /// レート制限で拒否されるリクエストも記録する
    /// （拒否されたリクエストも次の窓集計の対象になる）。
    pub async fn record(
        &self,
        email_hash: &str,
        ip_hash: Option<&str>,
    ) -> Result<ResetRequestLogEntry, sqlx::Error> {
        sqlx::query_as::<_, ResetRequestLogEntry>(
            r#"
            INSERT INTO reset_request_log (email_hash, ip_hash)
            VALUES ($1, $2)
            RETURNING id, email_hash, ip_hash, created_at
            "#,
        )
        .bind(email_hash)
        .bind(ip_hash)
        .fetch_one(&self.pool)
        .await
    }

    /// 指定時刻以降の同一メールハッシュのリクエスト数を数える
    pub async fn count_by_email_hash_since(
        &self,
        email_hash: &str,
        since: OffsetDateTime,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM reset_request_log
            WHERE email_hash = $1 AND created_at >= $2
            "#,
        )
        .bind(email_hash)
        .bind(since)
        .fetch_one(&self.pool)
        .await
    }

    /// 指定時刻以降の同一IPハッシュのリクエスト数を数える
    pub async fn count_by_ip_hash_since(
        &self,
        ip_hash: &str,
        since: OffsetDateTime,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM reset_request_log
            WHERE ip_hash = $1 AND created_at >= $2
            "#,
        )
        .bind(ip_hash)
        .bind(since)
        .fetch_one(&self.pool)
        .await
    }
}
