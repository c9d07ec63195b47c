//! SDK configuration.
//!
//! One explicit value constructed at initialization and handed to every
//! component that needs it; the SDK keeps no ambient configuration state.

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// Default cap on captured body bytes. Bodies past this are stored as
/// [`BODY_TOO_LARGE_PLACEHOLDER`] instead of being read in full.
pub const DEFAULT_MAX_BODY_CAPTURE_BYTES: usize = 250_000;

/// Stored in place of a body that exceeds the capture cap.
pub const BODY_TOO_LARGE_PLACEHOLDER: &str = "[body too large to capture]";

/// Stored when body bytes are not valid text and cannot be captured.
pub const BODY_UNREADABLE_PLACEHOLDER: &str = "[body unavailable]";

/// Stored in place of a sensitive header value.
pub const REDACTED_MARKER: &str = "[REDACTED]";

/// Header names whose values never reach storage, compared case-insensitively.
static REDACTED_HEADERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "authorization",
        "cookie",
        "set-cookie",
        "x-api-key",
        "x-auth-token",
        "authentication",
    ]
    .into_iter()
    .collect()
});

pub fn is_redacted_header(name: &str) -> bool {
    REDACTED_HEADERS.contains(name.to_ascii_lowercase().as_str())
}

/// Capture configuration for the interceptor.
#[derive(Debug, Clone)]
pub struct JarvisConfig {
    /// Bodies larger than this many bytes are stored as a placeholder.
    pub max_body_capture_bytes: usize,
}

impl Default for JarvisConfig {
    fn default() -> Self {
        Self {
            max_body_capture_bytes: DEFAULT_MAX_BODY_CAPTURE_BYTES,
        }
    }
}
