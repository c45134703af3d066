use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// メール内リンクのベースURL（リセット画面・確認画面のフロントエンド）
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    // トークン有効期限（作成時に固定、延長されない）
    #[serde(default = "default_password_reset_token_ttl_secs")]
    pub password_reset_token_ttl_secs: i64,
    #[serde(default = "default_email_verification_token_ttl_secs")]
    pub email_verification_token_ttl_secs: i64,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: i64,

    /// true の場合、メール未確認ユーザーのログインを拒否する
    #[serde(default)]
    pub require_verified_login: bool,

    /// 信頼できるプロキシ配下でのみ true にする。
    /// false の場合 X-Forwarded-For は無視し、接続元ソケットのIPを使う
    /// （直接アクセスのクライアントがヘッダー偽装でIPバケットを回避できないように）。
    #[serde(default)]
    pub trust_forwarded_for: bool,

    // メール送信設定
    /// トランザクションメールAPIのエンドポイント
    #[serde(default = "default_email_api_url")]
    pub email_api_url: String,
    /// APIキー（未設定の場合、送信が必要なリクエストは設定エラーになる）
    pub email_api_key: Option<SecretBox<String>>,
    /// 送信元アドレス
    #[serde(default = "default_email_from")]
    pub email_from: String,
    /// 開発用の送信先許可リスト（カンマ区切り）
    ///
    /// 送信元がサンドボックスドメインかつ許可リストが空の場合、
    /// 送信は完全に抑止される（設定上の安全弁）。
    #[serde(default)]
    pub email_allow_list: Option<String>,

    /// CORS で許可するオリジン（未設定の場合 CORS レイヤーなし）
    #[serde(default)]
    pub cors_allowed_origin: Option<String>,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS: i64 = 3600;
const DEFAULT_EMAIL_VERIFICATION_TOKEN_TTL_SECS: i64 = 24 * 3600;
const DEFAULT_SESSION_TTL_SECS: i64 = 7 * 24 * 3600;
const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";
const DEFAULT_EMAIL_FROM: &str = "onboarding@resend.dev";

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_public_base_url() -> String {
    DEFAULT_PUBLIC_BASE_URL.to_string()
}

fn default_password_reset_token_ttl_secs() -> i64 {
    DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS
}

fn default_email_verification_token_ttl_secs() -> i64 {
    DEFAULT_EMAIL_VERIFICATION_TOKEN_TTL_SECS
}

fn default_session_ttl_secs() -> i64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_email_api_url() -> String {
    DEFAULT_EMAIL_API_URL.to_string()
}

fn default_email_from() -> String {
    DEFAULT_EMAIL_FROM.to_string()
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// 許可リストをパース（空白を除去し、空要素は捨てる）
    pub fn allow_list(&self) -> Vec<String> {
        self.email_allow_list
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_allow_list(list: Option<&str>) -> Config {
        Config {
            database_url: SecretBox::new(Box::new("postgres://localhost/test".to_string())),
            host: default_host(),
            port: default_port(),
            public_base_url: default_public_base_url(),
            password_reset_token_ttl_secs: default_password_reset_token_ttl_secs(),
            email_verification_token_ttl_secs: default_email_verification_token_ttl_secs(),
            session_ttl_secs: default_session_ttl_secs(),
            require_verified_login: false,
            trust_forwarded_for: false,
            email_api_url: default_email_api_url(),
            email_api_key: None,
            email_from: default_email_from(),
            email_allow_list: list.map(str::to_string),
            cors_allowed_origin: None,
        }
    }

    #[test]
    fn test_allow_list_none() {
        let config = config_with_allow_list(None);
        assert!(config.allow_list().is_empty());
    }

    #[test]
    fn test_allow_list_parses_and_trims() {
        let config = config_with_allow_list(Some("a@example.com, b@example.com ,"));
        assert_eq!(
            config.allow_list(),
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
    }

    #[test]
    fn test_allow_list_empty_string() {
        let config = config_with_allow_list(Some("  "));
        assert!(config.allow_list().is_empty());
    }
}
