//! URL helpers.
//!
//! Only `http` and `https` URLs take part in the protocol. Hosts are
//! compared as `host[:port]` with default ports dropped.

use std::sync::LazyLock;

use regex::Regex;
use ::url::Url;

static HTTP_OR_HTTPS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://").ok());

static HTTPS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)^https://").ok());

/// Returns `true` if `url` starts with `http://` or `https://`.
#[must_use]
pub fn is_http_or_https_url(url: &str) -> bool {
    HTTP_OR_HTTPS.as_ref().is_some_and(|re| re.is_match(url))
}

/// Returns `true` if `url` starts with `https://`.
#[must_use]
pub fn is_https_url(url: &str) -> bool {
    HTTPS.as_ref().is_some_and(|re| re.is_match(url))
}

/// Strips a leading `http://` or `https://` from an origin.
#[must_use]
pub fn strip_scheme(origin: &str) -> &str {
    match HTTP_OR_HTTPS.as_ref().and_then(|re| re.find(origin)) {
        Some(m) => &origin[m.end()..],
        None => origin,
    }
}

/// Returns `host[:port]` of an absolute http(s) URL.
///
/// The port is omitted when it is the scheme default.
#[must_use]
pub fn url_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_checks() {
        assert!(is_http_or_https_url("http://a.com"));
        assert!(is_http_or_https_url("HTTPS://a.com"));
        assert!(!is_http_or_https_url("javascript:alert(1)"));
        assert!(!is_http_or_https_url("ftp://a.com"));

        assert!(is_https_url("https://a.com/x"));
        assert!(!is_https_url("http://a.com/x"));
    }

    #[test]
    fn test_url_host_drops_default_port() {
        assert_eq!(url_host("https://site.com:443/cb").as_deref(), Some("site.com"));
        assert_eq!(url_host("http://site.com:80/").as_deref(), Some("site.com"));
        assert_eq!(
            url_host("https://site.com:8443/cb").as_deref(),
            Some("site.com:8443")
        );
        assert_eq!(url_host("mailto:a@b.com"), None);
        assert_eq!(url_host("/relative"), None);
    }

    #[test]
    fn test_strip_scheme() {
        assert_eq!(strip_scheme("https://site.com"), "site.com");
        assert_eq!(strip_scheme("site.com:8080"), "site.com:8080");
    }
}
