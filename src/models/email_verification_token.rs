use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// メールアドレス確認トークン
///
/// パスワードリセットトークンと同じ形（ハッシュのみ保存、単回使用）。
/// 有効期限は24時間で、発行回数にユーザーごとの上限がある
/// （1分に1回、1日に5回まで）。
#[derive(Debug, FromRow, Serialize)]
pub struct EmailVerificationToken {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip)]
    pub token_hash: String,
    pub sent_to_email: String,
    pub expires_at: OffsetDateTime,
    pub consumed_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}
