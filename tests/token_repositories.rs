//! トークンリポジトリのSQL契約テスト
//!
//! 単回使用・既存トークンの無効化・期限切れの判定はすべて単一のSQL文の
//! 条件に載っているため、実DBに対して検証する。
//! `#[sqlx::test]` がテストごとに独立したDBを用意し、migrations/ を適用する。

use sqlx::PgPool;
use time::{Duration, OffsetDateTime};

use verigate::models::User;
use verigate::repositories::{
    EmailVerificationTokenRepository, PasswordResetTokenRepository, UserRepository,
};
use verigate::services::token::{generate_token, hash_token};

async fn insert_user(pool: &PgPool, email: &str) -> User {
    UserRepository::new(pool.clone())
        .create_user(email, "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$RWh6")
        .await
        .expect("ユーザー作成に失敗")
}

#[sqlx::test]
async fn reset_token_is_consumed_exactly_once(pool: PgPool) {
    let repo = PasswordResetTokenRepository::new(pool.clone());
    let user = insert_user(&pool, "once@example.com").await;

    let token = generate_token();
    let token_hash = hash_token(&token);
    let expires_at = OffsetDateTime::now_utc() + Duration::hours(1);
    repo.create(user.id, &token_hash, &user.email, expires_at)
        .await
        .unwrap();

    // 1回目は成功、同じハッシュの2回目は該当なし
    let first = repo.consume(&token_hash).await.unwrap();
    assert!(first.is_some());
    assert_eq!(first.unwrap().user_id, user.id);

    let second = repo.consume(&token_hash).await.unwrap();
    assert!(second.is_none());
}

#[sqlx::test]
async fn issuing_new_reset_token_invalidates_previous(pool: PgPool) {
    let repo = PasswordResetTokenRepository::new(pool.clone());
    let user = insert_user(&pool, "reissue@example.com").await;
    let expires_at = OffsetDateTime::now_utc() + Duration::hours(1);

    let first_hash = hash_token(&generate_token());
    repo.create(user.id, &first_hash, &user.email, expires_at)
        .await
        .unwrap();

    // 発行フローと同じ順序: 既存の未使用トークンを無効化してから新規作成
    let invalidated = repo.invalidate_active_for_user(user.id).await.unwrap();
    assert_eq!(invalidated, 1);

    let second_hash = hash_token(&generate_token());
    repo.create(user.id, &second_hash, &user.email, expires_at)
        .await
        .unwrap();

    // 古いトークンは期限内でも消費できない。新しいトークンは消費できる
    assert!(repo.consume(&first_hash).await.unwrap().is_none());
    assert!(repo.consume(&second_hash).await.unwrap().is_some());
}

#[sqlx::test]
async fn expired_reset_token_is_rejected(pool: PgPool) {
    let repo = PasswordResetTokenRepository::new(pool.clone());
    let user = insert_user(&pool, "expired@example.com").await;

    let token_hash = hash_token(&generate_token());
    let expires_at = OffsetDateTime::now_utc() - Duration::seconds(1);
    repo.create(user.id, &token_hash, &user.email, expires_at)
        .await
        .unwrap();

    // ハッシュが一致していても期限切れなら該当なし
    assert!(repo.consume(&token_hash).await.unwrap().is_none());
}

#[sqlx::test]
async fn verification_consume_and_verified_flag_set_once(pool: PgPool) {
    let user_repo = UserRepository::new(pool.clone());
    let repo = EmailVerificationTokenRepository::new(pool.clone());
    let user = insert_user(&pool, "verify@example.com").await;

    let token_hash = hash_token(&generate_token());
    let expires_at = OffsetDateTime::now_utc() + Duration::hours(24);
    repo.create(user.id, &token_hash, &user.email, expires_at)
        .await
        .unwrap();

    let consumed = repo.consume(&token_hash).await.unwrap();
    assert!(consumed.is_some());
    assert!(repo.consume(&token_hash).await.unwrap().is_none());

    // email_verified_at の設定は一度だけ。二度目は更新なし（冪等な成功扱い）
    assert!(user_repo.mark_email_verified(user.id).await.unwrap());
    assert!(!user_repo.mark_email_verified(user.id).await.unwrap());

    let reloaded = user_repo.find_by_id(user.id).await.unwrap().unwrap();
    assert!(reloaded.is_email_verified());
}
