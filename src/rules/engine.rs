//! Rule resolution and model-level modification application.

use std::sync::Arc;

use crate::models::{
    set_header, HttpMethod, NetworkRequest, NetworkResponse, NetworkRule, RequestModifications,
    ResponseModifications,
};
use crate::rules::store::RuleStore;

/// Resolves rules against captured requests and applies their modifications.
///
/// The engine is read-only over a shared [`RuleStore`]; interception calls it
/// synchronously from the request path, which is fine because the rule set is
/// small and locally cached.
pub struct RuleEngine {
    store: Arc<RuleStore>,
}

impl RuleEngine {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    /// Enabled rules matching the request, in stored (precedence) order.
    /// The first entry wins when the caller needs a single rule. A broken
    /// rule set must never break real traffic, so this cannot fail; it
    /// degrades to an empty list.
    pub fn find_matching_rules(&self, request: &NetworkRequest) -> Vec<NetworkRule> {
        self.store
            .list_rules()
            .into_iter()
            .filter(|rule| rule.is_enabled && rule.origin.matches(request))
            .collect()
    }

    /// Build the response model for a MOCK rule. Unspecified fields fall back
    /// to 200 / the canonical reason phrase / empty body.
    pub fn create_mock_response(
        &self,
        request: &NetworkRequest,
        rule: &NetworkRule,
    ) -> NetworkResponse {
        let mods = rule
            .response_modifications
            .clone()
            .unwrap_or_default();

        let status_code = mods.status_code.unwrap_or(200);
        let status_message = mods.status_message.clone().unwrap_or_else(|| {
            http::StatusCode::from_u16(status_code)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("OK")
                .to_string()
        });

        tracing::debug!(
            rule = %rule.name,
            method = %request.method,
            url = %request.url,
            status = status_code,
            "synthesizing mock response"
        );

        let mut headers = Vec::new();
        for (name, value) in &mods.add_headers {
            headers.push((name.clone(), value.clone()));
        }
        for (name, value) in &mods.modify_headers {
            set_header(&mut headers, name, value);
        }

        let mut response = NetworkResponse::new(status_code, status_message, headers);
        if let Some(body) = mods.body {
            response.body_size = body.len() as u64;
            response.body = Some(body);
        }
        response
    }

    /// Apply request modifications at the model level. Empty modification sets
    /// are the identity.
    pub fn apply_request_modifications(
        &self,
        request: &NetworkRequest,
        rule: &NetworkRule,
    ) -> NetworkRequest {
        let Some(mods) = &rule.request_modifications else {
            return request.clone();
        };
        let mut out = request.clone();

        for (name, value) in &mods.add_headers {
            out.headers.push((name.clone(), value.clone()));
        }
        for (name, value) in &mods.modify_headers {
            set_header(&mut out.headers, name, value);
        }
        for name in &mods.remove_headers {
            crate::models::remove_header(&mut out.headers, name);
        }
        if let Some(url) = &mods.url {
            out.url = url.clone();
        }
        if let Some(method) = &mods.method {
            out.method = HttpMethod::from_str_lossy(method);
        }
        if let Some(body) = &mods.body {
            out.body_size = body.len() as u64;
            out.body = Some(body.clone());
        }
        out
    }

    /// Apply response modifications at the model level. The artificial delay
    /// is temporal and handled by the interceptor, not here.
    pub fn apply_response_modifications(
        &self,
        response: &NetworkResponse,
        rule: &NetworkRule,
    ) -> NetworkResponse {
        let Some(mods) = &rule.response_modifications else {
            return response.clone();
        };
        let mut out = response.clone();

        for (name, value) in &mods.add_headers {
            out.headers.push((name.clone(), value.clone()));
        }
        for (name, value) in &mods.modify_headers {
            set_header(&mut out.headers, name, value);
        }
        for name in &mods.remove_headers {
            crate::models::remove_header(&mut out.headers, name);
        }
        if let Some(status) = mods.status_code {
            out.status_code = status;
        }
        if let Some(message) = &mods.status_message {
            out.status_message = message.clone();
        }
        if let Some(body) = &mods.body {
            out.body_size = body.len() as u64;
            out.body = Some(body.clone());
        }
        out
    }
}

/// Human-readable summaries of request modifications, for the audit record.
pub fn describe_request_modifications(mods: &RequestModifications) -> Vec<String> {
    let mut out = Vec::new();
    for name in mods.add_headers.keys() {
        out.push(format!("add header {name}"));
    }
    for name in mods.modify_headers.keys() {
        out.push(format!("overwrite header {name}"));
    }
    for name in &mods.remove_headers {
        out.push(format!("remove header {name}"));
    }
    if let Some(url) = &mods.url {
        out.push(format!("rewrite url to {url}"));
    }
    if let Some(method) = &mods.method {
        out.push(format!("override method to {}", method.to_uppercase()));
    }
    if let Some(body) = &mods.body {
        out.push(format!("replace request body ({} bytes)", body.len()));
    }
    out
}

/// Human-readable summaries of response modifications, for the audit record.
pub fn describe_response_modifications(mods: &ResponseModifications) -> Vec<String> {
    let mut out = Vec::new();
    for name in mods.add_headers.keys() {
        out.push(format!("add header {name}"));
    }
    for name in mods.modify_headers.keys() {
        out.push(format!("overwrite header {name}"));
    }
    for name in &mods.remove_headers {
        out.push(format!("remove header {name}"));
    }
    if let Some(status) = mods.status_code {
        out.push(format!("override status to {status}"));
    }
    if mods.status_message.is_some() {
        out.push("override status message".to_string());
    }
    if let Some(body) = &mods.body {
        out.push(format!("replace response body ({} bytes)", body.len()));
    }
    if let Some(delay) = mods.delay_ms {
        out.push(format!("delay response by {delay} ms"));
    }
    out
}
