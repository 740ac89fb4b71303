// Correlation cookies for the mobile-money redirect round trip

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

pub const ORDER_COOKIE: &str = "eh_mm_order";
pub const TOKEN_COOKIE: &str = "eh_mm_token";

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn set_cookie(name: &str, value: &str, max_age_seconds: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{name}={value}; Path=/; Max-Age={max_age_seconds}; HttpOnly; SameSite=Lax"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_cookie(name: &str) -> String {
    format!("{name}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; eh_mm_order=EH123 ; eh_mm_token=tok"),
        );
        assert_eq!(read_cookie(&headers, ORDER_COOKIE).as_deref(), Some("EH123"));
        assert_eq!(read_cookie(&headers, TOKEN_COOKIE).as_deref(), Some("tok"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn order_cookie_is_http_only_and_short_lived() {
        let cookie = set_cookie(ORDER_COOKIE, "EH1", 1800, true);
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=1800"));
        assert!(cookie.ends_with("Secure"));
        assert!(clear_cookie(ORDER_COOKIE).contains("Max-Age=0"));
    }
}
