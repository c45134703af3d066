use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    /// メールアドレス確認日時（未確認の場合は None）
    ///
    /// null → 日時 への遷移は一度だけ。確認済みを取り消すことはない。
    pub email_verified_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    /// メールアドレスが確認済みかどうか
    pub fn is_email_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}
