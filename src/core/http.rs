use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

const APP_USER_AGENT: &str = concat!("PackSync/", env!("CARGO_PKG_VERSION"));

pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .build()
}

/// Append a `t=<millis>` query parameter so CDN caches are bypassed.
pub fn with_cache_buster(url: &str, millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}t={millis}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_buster_starts_query() {
        assert_eq!(
            with_cache_buster("https://example.com/pack.zip", 42),
            "https://example.com/pack.zip?t=42"
        );
    }

    #[test]
    fn cache_buster_extends_existing_query() {
        assert_eq!(
            with_cache_buster("https://example.com/pack.zip?dl=1", 7),
            "https://example.com/pack.zip?dl=1&t=7"
        );
    }
}
