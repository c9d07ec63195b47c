//! Captured outbound request model.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::{header_value, Headers};

/// HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
    Connect,
}

impl HttpMethod {
    /// Convert from string (lossy, defaults to GET)
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "PATCH" => HttpMethod::Patch,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            "TRACE" => HttpMethod::Trace,
            "CONNECT" => HttpMethod::Connect,
            _ => HttpMethod::Get,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Connect => "CONNECT",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(HttpMethod::from_str_lossy(s))
    }
}

/// A single captured outbound request.
///
/// This is the stored copy, not the wire object: sensitive header values are
/// already redacted and the body is truncated to the configured capture limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRequest {
    /// Full request URL
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request headers in wire order
    pub headers: Headers,
    /// Captured body (if any)
    pub body: Option<String>,
    /// Request content type
    pub content_type: Option<String>,
    /// Size of the body on the wire, in bytes
    pub body_size: u64,
    /// Capture time, milliseconds since epoch
    pub timestamp: i64,
}

impl NetworkRequest {
    pub fn new(url: impl Into<String>, method: HttpMethod, headers: Headers) -> Self {
        let content_type = header_value(&headers, "content-type").map(str::to_string);
        Self {
            url: url.into(),
            method,
            headers,
            body: None,
            content_type,
            body_size: 0,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn has_body(&self) -> bool {
        self.body.as_deref().is_some_and(|b| !b.is_empty())
    }

    /// Scheme portion of the URL, lowercased. Falls back to "http" when the
    /// URL carries no scheme separator.
    pub fn protocol(&self) -> String {
        match self.url.find("://") {
            Some(pos) => self.url[..pos].to_ascii_lowercase(),
            None => "http".to_string(),
        }
    }

    /// Host portion of the URL, or "Unknown" when the URL does not parse.
    pub fn host(&self) -> String {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Path portion of the URL, or "/" when the URL does not parse.
    pub fn path(&self) -> String {
        match Url::parse(&self.url) {
            Ok(u) => {
                let p = u.path();
                if p.is_empty() {
                    "/".to_string()
                } else {
                    p.to_string()
                }
            }
            Err(_) => "/".to_string(),
        }
    }

    /// Effective port: explicit when present, otherwise the scheme default
    /// (443 for https, 80 for http). None when the URL does not parse.
    pub fn port(&self) -> Option<u16> {
        Url::parse(&self.url).ok()?.port_or_known_default()
    }

    /// Decoded query pairs, empty when the URL has no query or does not parse.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        match Url::parse(&self.url) {
            Ok(u) => u
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Raw query string, if present.
    pub fn query(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.query().map(str::to_string))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }
}
