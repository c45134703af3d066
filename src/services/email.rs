use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::Serialize;

use crate::config::Config;
use crate::error::AppError;

/// サンドボックス扱いする送信元ドメイン
///
/// これらのドメインから送る構成で許可リストが空の場合、送信を完全に抑止する
/// （開発環境で本物の宛先にメールが飛ばないための設定上の安全弁）。
const SANDBOX_SENDER_DOMAINS: &[&str] = &["resend.dev", "example.com"];

/// トランザクションメールAPIへの送信リクエスト
#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// メール送信サービス
///
/// トランザクションメールAPI（{from, to, subject, html} + Idempotency-Key）を
/// 呼び出す薄いクライアント。配送失敗は `AppError::EmailDelivery` として
/// トークンエラーとは別系統で返し、トークン発行をロールバックしない。
#[derive(Clone)]
pub struct EmailClient {
    client: reqwest::Client,
    config: Arc<Config>,
}

impl EmailClient {
    /// 新しい EmailClient を作成
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// パスワードリセットメールを送信
    pub async fn send_password_reset_email(
        &self,
        to: &str,
        reset_url: &str,
        idempotency_key: &str,
    ) -> Result<(), AppError> {
        let html = format!(
            "<p>パスワードリセットのリクエストを受け付けました。</p>\
             <p><a href=\"{reset_url}\">こちらのリンク</a>から新しいパスワードを設定してください。\
             リンクの有効期限は1時間です。</p>\
             <p>心当たりがない場合は、このメールを無視してください。</p>"
        );
        self.send(to, "パスワード再設定のご案内", &html, idempotency_key)
            .await
    }

    /// メールアドレス確認メールを送信
    pub async fn send_verification_email(
        &self,
        to: &str,
        verify_url: &str,
        idempotency_key: &str,
    ) -> Result<(), AppError> {
        let html = format!(
            "<p>ご登録ありがとうございます。</p>\
             <p><a href=\"{verify_url}\">こちらのリンク</a>からメールアドレスを確認してください。\
             リンクの有効期限は24時間です。</p>"
        );
        self.send(to, "メールアドレスの確認", &html, idempotency_key)
            .await
    }

    /// パスワード変更完了の通知メールを送信
    pub async fn send_password_changed_email(
        &self,
        to: &str,
        idempotency_key: &str,
    ) -> Result<(), AppError> {
        let html = "<p>パスワードが変更されました。</p>\
                    <p>心当たりがない場合は、すぐにパスワードリセットを行ってください。</p>";
        self.send(to, "パスワード変更のお知らせ", html, idempotency_key)
            .await
    }

    /// メールを1通送信
    ///
    /// 許可リストゲートで抑止された場合は送信せず成功として扱う
    /// （抑止はビジネスルールではなく設定上の安全弁）。
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        idempotency_key: &str,
    ) -> Result<(), AppError> {
        let from = self.config.email_from.as_str();
        let allow_list = self.config.allow_list();

        if let Some(reason) = suppress_reason(from, &allow_list, to) {
            tracing::info!(to = %to, subject = %subject, reason = %reason, "メール送信を抑止");
            return Ok(());
        }

        // APIキー未設定は設定エラー（配送エラーではなく 500）
        let api_key = self.config.email_api_key.as_ref().ok_or_else(|| {
            tracing::error!("EMAIL_API_KEY が未設定");
            AppError::Internal(anyhow::anyhow!("email api key not configured"))
        })?;

        let body = SendEmailRequest {
            from,
            to,
            subject,
            html,
        };

        let response = self
            .client
            .post(&self.config.email_api_url)
            .bearer_auth(api_key.expose_secret())
            .header("Idempotency-Key", idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, to = %to, "メールAPIへの接続に失敗");
                AppError::EmailDelivery("request failed".to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, to = %to, "メールAPIがエラーを返却");
            return Err(AppError::EmailDelivery(format!(
                "provider returned status {status}"
            )));
        }

        tracing::info!(to = %to, subject = %subject, "メール送信完了");
        Ok(())
    }
}

/// 送信を抑止すべき場合、その理由を返す
///
/// - サンドボックス送信元かつ許可リストが空 → 全面抑止
/// - 許可リストが設定されていて宛先が載っていない → 抑止
fn suppress_reason(from: &str, allow_list: &[String], to: &str) -> Option<&'static str> {
    let sandbox = sender_domain(from)
        .map(|d| SANDBOX_SENDER_DOMAINS.iter().any(|s| d.eq_ignore_ascii_case(s)))
        .unwrap_or(true);

    if sandbox && allow_list.is_empty() {
        return Some("サンドボックス送信元かつ許可リスト未設定");
    }

    if !allow_list.is_empty() && !allow_list.iter().any(|a| a.eq_ignore_ascii_case(to)) {
        return Some("許可リスト外の宛先");
    }

    None
}

/// 送信元のドメイン部分を取り出す
///
/// `表示名 <addr@domain>` 形式と素のアドレスの両方を受け付ける
fn sender_domain(from: &str) -> Option<&str> {
    let addr = match (from.rfind('<'), from.rfind('>')) {
        (Some(start), Some(end)) if start < end => &from[start + 1..end],
        _ => from,
    };
    let domain = addr.rsplit('@').next()?;
    if domain == addr {
        // '@' がない
        return None;
    }
    Some(domain.trim())
}
