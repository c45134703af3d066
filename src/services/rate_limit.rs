use time::{Duration, OffsetDateTime};

use crate::error::AppError;
use crate::repositories::ResetRequestLogRepository;

/// 集計窓（直近60分のスライディングウィンドウ）
const RESET_WINDOW_SECS: i64 = 3600;
/// 同一メールハッシュあたりの上限（窓内）
const RESET_EMAIL_LIMIT: i64 = 3;
/// 同一IPハッシュあたりの上限（窓内）
const RESET_IP_LIMIT: i64 = 20;

/// パスワードリセットリクエストのレート制限
///
/// 追記専用ログの窓集計で判定する。上限超過は呼び出し側で「静かにスキップ」
/// する（APIレスポンスは通常時と同一の汎用成功。レート制限されたことを
/// クライアントに見せると、メールアドレスの存在有無の推測材料になるため）。
#[derive(Clone)]
pub struct ResetRateLimiter {
    log_repo: ResetRequestLogRepository,
}

impl ResetRateLimiter {
    pub fn new(log_repo: ResetRequestLogRepository) -> Self {
        Self { log_repo }
    }

    /// 窓内のリクエスト数を確認し、今回のリクエストを記録する
    ///
    /// 記録は判定結果に関わらず行う（拒否されたリクエストも次回の集計対象）。
    ///
    /// # Returns
    /// 処理を続行してよい場合 true、上限超過でスキップすべき場合 false
    pub async fn check_and_record(
        &self,
        email_hash: &str,
        ip_hash: Option<&str>,
    ) -> Result<bool, AppError> {
        let since = OffsetDateTime::now_utc() - Duration::seconds(RESET_WINDOW_SECS);

        let email_count = self
            .log_repo
            .count_by_email_hash_since(email_hash, since)
            .await?;

        let ip_count = match ip_hash {
            Some(hash) => self.log_repo.count_by_ip_hash_since(hash, since).await?,
            None => 0,
        };

        self.log_repo.record(email_hash, ip_hash).await?;

        if over_limit(email_count, ip_count) {
            tracing::warn!(
                email_count = email_count,
                ip_count = ip_count,
                "リセットリクエストのレート制限超過（静かにスキップ）"
            );
            return Ok(false);
        }

        Ok(true)
    }
}

/// 窓内の件数が上限に達しているか
fn over_limit(email_count: i64, ip_count: i64) -> bool {
    email_count >= RESET_EMAIL_LIMIT || ip_count >= RESET_IP_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_limit() {
        assert!(!over_limit(0, 0));
        assert!(!over_limit(2, 19));
    }

    #[test]
    fn test_email_limit_reached() {
        // 窓内に既に3件 → 4件目は超過
        assert!(over_limit(3, 0));
        assert!(over_limit(10, 0));
    }

    #[test]
    fn test_ip_limit_reached() {
        assert!(over_limit(0, 20));
    }

    #[test]
    fn test_either_limit_triggers() {
        assert!(over_limit(3, 19));
        assert!(over_limit(2, 20));
    }
}
