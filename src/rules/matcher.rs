//! Origin predicate evaluation.
//!
//! Matching runs on the request path, so every extractor degrades to a safe
//! default (empty host, root path, no port) instead of panicking on URLs the
//! `url` crate refuses to parse.

use wildmatch::WildMatch;

use crate::models::{NetworkRequest, RuleOrigin};

impl RuleOrigin {
    /// True iff every present field is satisfied by the request.
    pub fn matches(&self, request: &NetworkRequest) -> bool {
        if let Some(protocols) = &self.protocols {
            if !protocols.is_empty() {
                let scheme = request.protocol();
                if !protocols.iter().any(|p| p.eq_ignore_ascii_case(&scheme)) {
                    return false;
                }
            }
        }

        if let Some(pattern) = &self.host {
            if !host_matches(pattern, &request.host()) {
                return false;
            }
        }

        if let Some(expected) = self.port {
            if request.port() != Some(expected) {
                return false;
            }
        }

        if let Some(pattern) = &self.path {
            if !path_matches(pattern, &request.path()) {
                return false;
            }
        }

        if let Some(pattern) = &self.query {
            if !query_matches(pattern, &request.query_pairs()) {
                return false;
            }
        }

        if let Some(method) = &self.method {
            if !method.eq_ignore_ascii_case(request.method.as_str()) {
                return false;
            }
        }

        true
    }
}

/// Host grammar: exact, `*`, `*.suffix` (strict sub-domain), `prefix.*`,
/// embedded glob. All comparisons case-insensitive.
fn host_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let host = host.to_ascii_lowercase();

    if pattern == "*" {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return host.ends_with(&format!(".{suffix}"));
    }
    if let Some(prefix) = pattern.strip_suffix(".*") {
        return host.starts_with(&format!("{prefix}."));
    }
    if pattern.contains('*') {
        return WildMatch::new(&pattern).matches(&host);
    }
    pattern == host
}

/// Path grammar: exact, `*`, `prefix/**` (any depth), `prefix/*` (exactly one
/// more segment), embedded glob. Case-insensitive.
fn path_matches(pattern: &str, path: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let path = path.to_ascii_lowercase();

    if pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix("/**") {
        return path == prefix || path.starts_with(&format!("{prefix}/"));
    }
    if let Some(prefix) = pattern.strip_suffix("/*") {
        return match path.strip_prefix(&format!("{prefix}/")) {
            Some(rest) => !rest.is_empty() && !rest.contains('/'),
            None => false,
        };
    }
    if pattern.contains('*') {
        return WildMatch::new(&pattern).matches(&path);
    }
    pattern == path
}

/// Query subset match. The pattern is itself a query string; every pattern key
/// must be present with an equal value, or `*` for "key present, any value".
/// An empty pattern matches only an empty actual query.
fn query_matches(pattern: &str, actual: &[(String, String)]) -> bool {
    if pattern.is_empty() {
        return actual.is_empty();
    }
    url::form_urlencoded::parse(pattern.as_bytes()).all(|(key, value)| {
        actual
            .iter()
            .any(|(k, v)| *k == key && (value == "*" || *v == value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HttpMethod, NetworkRequest};

    fn request(url: &str) -> NetworkRequest {
        NetworkRequest::new(url, HttpMethod::Get, Vec::new())
    }

    fn origin() -> RuleOrigin {
        RuleOrigin::default()
    }

    #[test]
    fn empty_origin_matches_everything() {
        assert!(origin().matches(&request("https://api.example.com/v1/users")));
        assert!(origin().matches(&request("not a url at all")));
    }

    #[test]
    fn host_suffix_wildcard() {
        let o = RuleOrigin {
            host: Some("*.example.com".into()),
            ..origin()
        };
        assert!(o.matches(&request("https://api.example.com/x")));
        assert!(o.matches(&request("https://API.EXAMPLE.COM/x")));
        assert!(!o.matches(&request("https://example.org/x")));
        assert!(!o.matches(&request("https://example.com/x")));
    }

    #[test]
    fn host_prefix_wildcard_and_exact() {
        let prefix = RuleOrigin {
            host: Some("api.*".into()),
            ..origin()
        };
        assert!(prefix.matches(&request("https://api.example.com/")));
        assert!(!prefix.matches(&request("https://www.example.com/")));

        let exact = RuleOrigin {
            host: Some("Example.Com".into()),
            ..origin()
        };
        assert!(exact.matches(&request("https://example.com/")));

        let all = RuleOrigin {
            host: Some("*".into()),
            ..origin()
        };
        assert!(all.matches(&request("https://anything.example/")));
    }

    #[test]
    fn path_double_star_matches_any_depth() {
        let o = RuleOrigin {
            path: Some("/users/**".into()),
            ..origin()
        };
        assert!(o.matches(&request("https://x.test/users/1/edit")));
        assert!(o.matches(&request("https://x.test/users/1")));
        assert!(o.matches(&request("https://x.test/users")));
        assert!(!o.matches(&request("https://x.test/accounts/1")));
    }

    #[test]
    fn path_single_star_matches_one_segment() {
        let o = RuleOrigin {
            path: Some("/users/*".into()),
            ..origin()
        };
        assert!(o.matches(&request("https://x.test/users/1")));
        assert!(!o.matches(&request("https://x.test/users/1/edit")));
        assert!(!o.matches(&request("https://x.test/users")));
    }

    #[test]
    fn path_embedded_glob() {
        let o = RuleOrigin {
            path: Some("/v*/users".into()),
            ..origin()
        };
        assert!(o.matches(&request("https://x.test/v1/users")));
        assert!(o.matches(&request("https://x.test/v2/users")));
        assert!(!o.matches(&request("https://x.test/users")));
    }

    #[test]
    fn port_defaults_by_scheme() {
        let https = RuleOrigin {
            port: Some(443),
            ..origin()
        };
        assert!(https.matches(&request("https://example.com/")));
        assert!(!https.matches(&request("http://example.com/")));

        let explicit = RuleOrigin {
            port: Some(8080),
            ..origin()
        };
        assert!(explicit.matches(&request("http://example.com:8080/")));
        assert!(!explicit.matches(&request("http://example.com/")));
    }

    #[test]
    fn protocol_membership_is_case_insensitive() {
        let o = RuleOrigin {
            protocols: Some(vec!["HTTPS".into()]),
            ..origin()
        };
        assert!(o.matches(&request("https://example.com/")));
        assert!(!o.matches(&request("http://example.com/")));

        let empty = RuleOrigin {
            protocols: Some(Vec::new()),
            ..origin()
        };
        assert!(empty.matches(&request("http://example.com/")));
    }

    #[test]
    fn query_subset_and_wildcard_values() {
        let o = RuleOrigin {
            query: Some("debug=1&user=*".into()),
            ..origin()
        };
        assert!(o.matches(&request("https://x.test/p?debug=1&user=42&extra=y")));
        assert!(!o.matches(&request("https://x.test/p?debug=2&user=42")));
        assert!(!o.matches(&request("https://x.test/p?debug=1")));

        let empty = RuleOrigin {
            query: Some(String::new()),
            ..origin()
        };
        assert!(empty.matches(&request("https://x.test/p")));
        assert!(!empty.matches(&request("https://x.test/p?a=1")));
    }

    #[test]
    fn method_is_case_insensitive() {
        let o = RuleOrigin {
            method: Some("get".into()),
            ..origin()
        };
        assert!(o.matches(&request("https://x.test/")));

        let post = RuleOrigin {
            method: Some("POST".into()),
            ..origin()
        };
        assert!(!post.matches(&request("https://x.test/")));
    }

    #[test]
    fn unparsable_urls_never_panic() {
        let o = RuleOrigin {
            host: Some("*.example.com".into()),
            port: Some(443),
            path: Some("/users/**".into()),
            query: Some("a=1".into()),
            ..origin()
        };
        // Extraction falls back to defaults, the predicate just fails to match.
        assert!(!o.matches(&request("::::not-a-url")));
    }
}
