//! Captured response model.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::{header_value, Headers};

/// Coarse classification of a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCategory {
    Informational,
    Success,
    Redirect,
    ClientError,
    ServerError,
    Unknown,
}

/// A captured response, synthetic or real.
///
/// Like [`crate::models::NetworkRequest`], this is the stored copy: headers
/// pass through the redaction filter and the body is size-capped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkResponse {
    pub status_code: u16,
    pub status_message: String,
    /// Response headers in wire order
    pub headers: Headers,
    /// Captured body (if any)
    pub body: Option<String>,
    pub content_type: Option<String>,
    /// Size of the body on the wire, in bytes
    pub body_size: u64,
    /// Capture time, milliseconds since epoch
    pub timestamp: i64,
}

impl NetworkResponse {
    pub fn new(status_code: u16, status_message: impl Into<String>, headers: Headers) -> Self {
        let content_type = header_value(&headers, "content-type").map(str::to_string);
        Self {
            status_code,
            status_message: status_message.into(),
            headers,
            body: None,
            content_type,
            body_size: 0,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn is_successful(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code)
    }

    pub fn status_category(&self) -> StatusCategory {
        match self.status_code {
            100..=199 => StatusCategory::Informational,
            200..=299 => StatusCategory::Success,
            300..=399 => StatusCategory::Redirect,
            400..=499 => StatusCategory::ClientError,
            500..=599 => StatusCategory::ServerError,
            _ => StatusCategory::Unknown,
        }
    }

    fn content_type_contains(&self, needle: &str) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains(needle))
    }

    pub fn is_json(&self) -> bool {
        self.content_type_contains("json")
    }

    pub fn is_xml(&self) -> bool {
        self.content_type_contains("xml")
    }

    pub fn is_html(&self) -> bool {
        self.content_type_contains("html")
    }

    pub fn is_image(&self) -> bool {
        self.content_type_contains("image")
    }

    pub fn is_text(&self) -> bool {
        self.content_type_contains("text") || self.is_json() || self.is_xml() || self.is_html()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }
}
