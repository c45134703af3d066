use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// ログインセッション
///
/// Bearer トークン（平文）はログイン時にクライアントへ返却し、
/// DBにはSHA256ハッシュのみ保存する。
#[derive(Debug, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}
