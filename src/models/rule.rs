//! User-authored interception rules.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// What a matching rule does to the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleMode {
    /// Mutate the request and/or response but still perform the real call.
    Inspect,
    /// Synthesize a response and skip the real call entirely.
    Mock,
}

impl RuleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleMode::Inspect => "INSPECT",
            RuleMode::Mock => "MOCK",
        }
    }
}

/// The match predicate portion of a rule.
///
/// Every field is independently optional: an absent field matches everything,
/// a present field must be satisfied (logical AND across present fields).
/// Host and path support the wildcard grammar implemented in
/// [`crate::rules::matcher`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleOrigin {
    /// Accepted schemes, compared case-insensitively. Empty list matches all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocols: Option<Vec<String>>,
    /// Host pattern: exact, `*`, `*.suffix`, `prefix.*`, or embedded glob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Exact port; scheme defaults (443/80) apply when the URL has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Path pattern: exact, `*`, `prefix/**`, `prefix/*`, or embedded glob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Query pattern, itself a query string. Each pattern key must be present
    /// with an equal value, or `*` for "key present, any value".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Case-insensitive method name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// Mutations applied to an outgoing request under INSPECT.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestModifications {
    /// Headers appended to the request.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub add_headers: HashMap<String, String>,
    /// Headers overwritten in place (appended when absent).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub modify_headers: HashMap<String, String>,
    /// Header names removed from the request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_headers: Vec<String>,
    /// Replacement body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Replacement URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Replacement method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl RequestModifications {
    pub fn is_empty(&self) -> bool {
        self.add_headers.is_empty()
            && self.modify_headers.is_empty()
            && self.remove_headers.is_empty()
            && self.body.is_none()
            && self.url.is_none()
            && self.method.is_none()
    }
}

/// Mutations applied to a response under INSPECT, or the template for a MOCK
/// response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseModifications {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub add_headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub modify_headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_headers: Vec<String>,
    /// Replacement status code (MOCK default: 200).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Replacement status message (MOCK default: "OK").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    /// Replacement body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Artificial delay before the response is handed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

impl ResponseModifications {
    pub fn is_empty(&self) -> bool {
        self.add_headers.is_empty()
            && self.modify_headers.is_empty()
            && self.remove_headers.is_empty()
            && self.status_code.is_none()
            && self.status_message.is_none()
            && self.body.is_none()
            && self.delay_ms.is_none()
    }
}

/// Input payload for creating or updating a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleInput {
    pub name: String,
    pub is_enabled: bool,
    pub origin: RuleOrigin,
    pub mode: RuleMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_modifications: Option<RequestModifications>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_modifications: Option<ResponseModifications>,
}

impl Default for RuleInput {
    fn default() -> Self {
        Self {
            name: String::new(),
            is_enabled: true,
            origin: RuleOrigin::default(),
            mode: RuleMode::Inspect,
            request_modifications: None,
            response_modifications: None,
        }
    }
}

/// A stored rule. The mode is fixed at creation: INSPECT never skips the real
/// call, MOCK never makes one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRule {
    pub id: String,
    pub name: String,
    pub is_enabled: bool,
    pub origin: RuleOrigin,
    pub mode: RuleMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_modifications: Option<RequestModifications>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_modifications: Option<ResponseModifications>,
    /// Milliseconds since epoch
    pub created_at: i64,
    /// Milliseconds since epoch
    pub last_modified: i64,
}

impl NetworkRule {
    pub fn from_input(input: RuleInput) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name,
            is_enabled: input.is_enabled,
            origin: input.origin,
            mode: input.mode,
            request_modifications: input.request_modifications,
            response_modifications: input.response_modifications,
            created_at: now,
            last_modified: now,
        }
    }
}

/// Append-only audit record of one rule application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleApplicationResult {
    pub rule_id: String,
    pub rule_name: String,
    pub mode: RuleMode,
    /// Whether any modification actually took effect.
    pub applied: bool,
    /// Human-readable descriptions of the individual modifications.
    pub modifications: Vec<String>,
    /// Milliseconds since epoch
    pub timestamp: i64,
}

impl RuleApplicationResult {
    pub fn new(rule: &NetworkRule, modifications: Vec<String>) -> Self {
        Self {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            mode: rule.mode,
            applied: !modifications.is_empty(),
            modifications,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}
