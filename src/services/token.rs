use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

/// 32バイトのランダムトークンを生成（URLセーフBase64、パディングなし）
///
/// 平文トークンはメールのリンクにのみ埋め込み、DB・ログには残さない。
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// トークンをSHA256でハッシュ化（16進文字列）
///
/// DBに保存するのはこのダイジェストのみ
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// 識別子（メールアドレス・IPアドレス）をハッシュ化
///
/// レート制限のバケットキーに使う。メールアドレスは大文字小文字・前後空白の
/// 揺れで別バケットにならないよう正規化してからハッシュ化する。
pub fn hash_identifier(value: &str) -> String {
    hash_token(&value.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_length() {
        // 32バイト → Base64（パディングなし）で43文字
        let token = generate_token();
        assert_eq!(token.len(), 43);
    }

    #[test]
    fn test_generate_token_url_safe() {
        let token = generate_token();
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_token_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn test_hash_token_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn test_hash_token_hex_digest() {
        let hash = hash_token("some-token");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_identifier_normalizes() {
        assert_eq!(
            hash_identifier("User@Example.com"),
            hash_identifier("  user@example.com  ")
        );
    }

    #[test]
    fn test_hash_identifier_plain_input_matches_raw_hash() {
        // 正規化の必要がない入力では通常のハッシュと一致する
        assert_eq!(hash_identifier("user@example.com"), hash_token("user@example.com"));
    }
}
