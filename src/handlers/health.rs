use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

/// ヘルスチェックレスポンス
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

/// ヘルスチェックハンドラー
///
/// GET /api/health
///
/// コネクションプールに SELECT 1 を投げてDB疎通も確認する
/// （トークンの発行・消費はすべてDB経由のため、疎通失敗は degraded）。
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db_pool)
        .await
        .is_ok();

    if !database_ok {
        tracing::error!("ヘルスチェック: データベース疎通に失敗");
    }

    Json(HealthResponse {
        status: overall_status(database_ok),
        database: if database_ok { "ok" } else { "unreachable" },
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// サービス全体のステータスを決定
fn overall_status(database_ok: bool) -> &'static str {
    if database_ok { "ok" } else { "degraded" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status_ok() {
        assert_eq!(overall_status(true), "ok");
    }

    #[test]
    fn test_overall_status_degraded_without_database() {
        assert_eq!(overall_status(false), "degraded");
    }
}
