use axum::http::{header, HeaderMap};
use subtle::ConstantTimeEq;

/// Constant-time string comparison for API keys.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Whether a request may read analytics. Open when no key is configured.
pub fn analytics_authorized(expected_key: Option<&str>, headers: &HeaderMap) -> bool {
    match expected_key {
        None => true,
        Some(expected) => bearer_token(headers)
            .map(|token| constant_time_compare(token, expected))
            .unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("secret123", "secret123"));
        assert!(!constant_time_compare("secret123", "secret124"));
        assert!(!constant_time_compare("secret123", "secret12"));
        assert!(!constant_time_compare("", "secret"));
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&with_auth("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&with_auth("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&with_auth("Basic abc")), None);
        assert_eq!(bearer_token(&with_auth("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_analytics_open_without_key() {
        assert!(analytics_authorized(None, &HeaderMap::new()));
    }

    #[test]
    fn test_analytics_requires_matching_key() {
        assert!(analytics_authorized(Some("k1"), &with_auth("Bearer k1")));
        assert!(!analytics_authorized(Some("k1"), &with_auth("Bearer k2")));
        assert!(!analytics_authorized(Some("k1"), &HeaderMap::new()));
    }
}
