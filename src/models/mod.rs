//! Data models for the Jarvis network inspector.
//!
//! Everything in here is an immutable value type: processing steps build new
//! values instead of mutating shared state, so captured data can cross from
//! the network path to the background persistence path without locking.

pub mod request;
pub mod response;
pub mod rule;
pub mod transaction;

pub use request::*;
pub use response::*;
pub use rule::*;
pub use transaction::*;

/// Ordered header list. Capture preserves wire order and duplicate names.
pub type Headers = Vec<(String, String)>;

/// Look up the first header with the given name, case-insensitively.
pub fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Replace every header with the given name, or append when absent.
pub fn set_header(headers: &mut Headers, name: &str, value: &str) {
    let mut replaced = false;
    for (k, v) in headers.iter_mut() {
        if k.eq_ignore_ascii_case(name) {
            *v = value.to_string();
            replaced = true;
        }
    }
    if !replaced {
        headers.push((name.to_string(), value.to_string()));
    }
}

/// Drop every header with the given name. Returns whether anything was removed.
pub fn remove_header(headers: &mut Headers, name: &str) -> bool {
    let before = headers.len();
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    before != headers.len()
}
