use serde::{Deserialize, Serialize};

/// Browser cookie as persisted in the cookie jar and injected at restore time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    /// Seconds since the epoch; `None` for session cookies.
    #[serde(default)]
    pub expiry: Option<f64>,
}

/// Canonicalize a cookie domain against the registrable root domain so that
/// cookies captured on one subdomain apply broadly on restore.
///
/// A leading dot is stripped, and any subdomain of `root_domain` collapses to
/// `root_domain` itself. The result is a fixed point: normalizing an already
/// normalized domain yields the same value.
pub fn normalize_cookie_domain(domain: &str, root_domain: &str) -> String {
    let trimmed = domain.strip_prefix('.').unwrap_or(domain);
    if trimmed == root_domain || trimmed.ends_with(&format!(".{root_domain}")) {
        root_domain.to_string()
    } else {
        trimmed.to_string()
    }
}

impl Cookie {
    /// Returns a copy with its domain normalized against `root_domain`.
    pub fn normalized(&self, root_domain: &str) -> Self {
        let mut cookie = self.clone();
        cookie.domain = normalize_cookie_domain(&self.domain, root_domain);
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_dot_stripped() {
        assert_eq!(
            normalize_cookie_domain(".example.com", "example.com"),
            "example.com"
        );
    }

    #[test]
    fn test_subdomain_collapses_to_root() {
        assert_eq!(
            normalize_cookie_domain("publish.example.com", "example.com"),
            "example.com"
        );
        assert_eq!(
            normalize_cookie_domain("www.example.com", "example.com"),
            "example.com"
        );
    }

    #[test]
    fn test_dot_form_and_subdomain_form_converge() {
        let a = normalize_cookie_domain(".example.com", "example.com");
        let b = normalize_cookie_domain("publish.example.com", "example.com");
        assert_eq!(a, b);
    }

    #[test]
    fn test_idempotent() {
        let once = normalize_cookie_domain(".publish.example.com", "example.com");
        let twice = normalize_cookie_domain(&once, "example.com");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unrelated_domain_untouched() {
        assert_eq!(
            normalize_cookie_domain("cdn.other.net", "example.com"),
            "cdn.other.net"
        );
    }
}
