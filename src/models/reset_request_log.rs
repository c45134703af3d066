use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// パスワードリセットリクエストのログエントリ
///
/// レート制限の窓集計にのみ使用する追記専用テーブル。
/// 更新・削除はしない（保持期間の整理は外部のリテンション処理に委ねる）。
/// メールアドレス・IPアドレスは平文では持たず、SHA256ハッシュのみ保存する。
#[derive(Debug, FromRow)]
pub struct ResetRequestLogEntry {
    pub id: Uuid,
    pub email_hash: String,
    pub ip_hash: Option<String>,
    pub created_at: OffsetDateTime,
}
