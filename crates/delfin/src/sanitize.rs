//! Helpers for sanitizing data before it enters logs and tracing spans.
//!
//! Logs are safe to share for debugging: these functions ensure no API keys
//! or full image paths leak into them.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Masks the value of a `key` query parameter in a URL.
///
/// - `https://host/v1/models/m:generateContent?key=abc` → `...?key=****`
/// - `https://host/v1?alt=json&key=abc&x=1` → `...?alt=json&key=****&x=1`
/// - URLs without a `key` parameter are returned unchanged.
pub fn redact_api_key(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let redacted: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some(("key", _)) => "key=****".to_string(),
            _ => pair.to_string(),
        })
        .collect();

    format!("{}?{}", base, redacted.join("&"))
}

/// Shows only the last four characters of a secret, for display in `config show`.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_path_returns_filename() {
        assert_eq!(
            redact_path(Path::new("/home/user/Pictures/pedido.jpg")),
            "pedido.jpg"
        );
    }

    #[test]
    fn test_redact_path_no_filename() {
        assert_eq!(redact_path(Path::new("/")), "<unknown>");
    }

    #[test]
    fn test_redact_api_key_only_param() {
        assert_eq!(
            redact_api_key("https://example.com/v1beta/models/m:generateContent?key=AIzaSecret"),
            "https://example.com/v1beta/models/m:generateContent?key=****"
        );
    }

    #[test]
    fn test_redact_api_key_among_other_params() {
        assert_eq!(
            redact_api_key("https://example.com/x?alt=json&key=AIzaSecret&v=2"),
            "https://example.com/x?alt=json&key=****&v=2"
        );
    }

    #[test]
    fn test_redact_api_key_no_query() {
        assert_eq!(
            redact_api_key("https://example.com/x"),
            "https://example.com/x"
        );
    }

    #[test]
    fn test_redact_api_key_does_not_touch_similar_names() {
        assert_eq!(
            redact_api_key("https://example.com/x?monkey=1"),
            "https://example.com/x?monkey=1"
        );
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("AIzaSyABCDEF1234"), "****1234");
        assert_eq!(mask_secret("abc"), "****");
    }
}
