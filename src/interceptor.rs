//! The interception chain link.
//!
//! The interceptor wraps every outbound call of the host HTTP client: it
//! captures a redacted, size-capped model of the request, consults the rule
//! engine, then either synthesizes a mock response (skipping the network
//! entirely) or forwards the possibly rewritten request down the chain.
//! Lifecycle events are handed to the [`Collector`] fire-and-forget; the only
//! failures that ever reach the caller are the underlying network's own.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{Request, Response, StatusCode};

use crate::collector::Collector;
use crate::config::{
    is_redacted_header, JarvisConfig, BODY_TOO_LARGE_PLACEHOLDER, BODY_UNREADABLE_PLACEHOLDER,
    REDACTED_MARKER,
};
use crate::error::ConfigError;
use crate::models::{
    HttpMethod, NetworkRequest, NetworkResponse, NetworkRule, NetworkTransaction,
    RequestModifications, ResponseModifications, RuleApplicationResult, RuleMode,
};
use crate::rules::{
    describe_request_modifications, describe_response_modifications, RuleEngine,
};

/// The host client's interceptor contract: the next link of the chain.
///
/// `proceed` performs the real call (or hands off to the next interceptor) and
/// must be invoked at most once per intercepted request.
#[async_trait]
pub trait Chain: Send + Sync {
    async fn proceed(&self, request: Request<Bytes>) -> anyhow::Result<Response<Bytes>>;
}

/// Terminal chain link that executes the request with `reqwest`.
#[derive(Default)]
pub struct ReqwestChain {
    client: reqwest::Client,
}

impl ReqwestChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Chain for ReqwestChain {
    async fn proceed(&self, request: Request<Bytes>) -> anyhow::Result<Response<Bytes>> {
        let (parts, body) = request.into_parts();
        let url = parts.uri.to_string();

        let mut builder = self.client.request(parts.method, &url).headers(parts.headers);
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let upstream = builder.send().await?;
        let status = upstream.status();
        let headers = upstream.headers().clone();
        let bytes = upstream.bytes().await?;

        let mut response = Response::new(bytes);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// The interceptor. Construct via [`Interceptor::builder`]; the rule engine
/// and collector are required dependencies.
pub struct Interceptor {
    engine: Arc<RuleEngine>,
    collector: Arc<Collector>,
    config: JarvisConfig,
}

#[derive(Default)]
pub struct InterceptorBuilder {
    engine: Option<Arc<RuleEngine>>,
    collector: Option<Arc<Collector>>,
    config: JarvisConfig,
}

impl InterceptorBuilder {
    pub fn rule_engine(mut self, engine: Arc<RuleEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn collector(mut self, collector: Arc<Collector>) -> Self {
        self.collector = Some(collector);
        self
    }

    pub fn config(mut self, config: JarvisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Interceptor, ConfigError> {
        if self.config.max_body_capture_bytes == 0 {
            return Err(ConfigError::ZeroBodyCapture);
        }
        Ok(Interceptor {
            engine: self.engine.ok_or(ConfigError::MissingRuleEngine)?,
            collector: self.collector.ok_or(ConfigError::MissingCollector)?,
            config: self.config,
        })
    }
}

impl Interceptor {
    pub fn builder() -> InterceptorBuilder {
        InterceptorBuilder::default()
    }

    /// Intercept one outbound call.
    ///
    /// Returns the response the caller would have seen without the SDK
    /// installed, except where a MOCK rule short-circuits the call or an
    /// INSPECT rule rewrites it. Network failures are re-thrown unmodified.
    pub async fn intercept<C>(
        &self,
        request: Request<Bytes>,
        chain: &C,
    ) -> anyhow::Result<Response<Bytes>>
    where
        C: Chain + ?Sized,
    {
        let captured = capture_request(&request, &self.config);
        let transaction = NetworkTransaction::new(captured);

        // A broken rule set must never break real traffic; lookup degrades to
        // "no matching rules" inside the engine.
        let winning = self
            .engine
            .find_matching_rules(&transaction.request)
            .into_iter()
            .next();

        if let Some(rule) = winning.as_ref().filter(|r| r.mode == RuleMode::Mock) {
            return self.serve_mock(transaction, rule).await;
        }

        let inspect_rule = winning.filter(|r| r.mode == RuleMode::Inspect);

        // Rewrite the outgoing request first, then capture what actually goes
        // on the wire, so the stored copy reflects the rewrite (and stays
        // redacted even for headers the rule itself injected).
        let request_mods = inspect_rule
            .as_ref()
            .and_then(|r| r.request_modifications.as_ref())
            .filter(|mods| !mods.is_empty());
        let (request, transaction) = match request_mods {
            Some(mods) => {
                let rewritten = apply_request_modifications_http(request, mods);
                let recaptured = capture_request(&rewritten, &self.config);
                (
                    rewritten,
                    NetworkTransaction {
                        request: recaptured,
                        ..transaction
                    },
                )
            }
            None => (request, transaction),
        };

        if let Some(rule) = inspect_rule.as_ref() {
            self.collector
                .on_rule_applied(inspect_application(rule));
        }

        // Dispatched before the outcome of the call is known.
        self.collector.on_request_sent(transaction.clone());

        match chain.proceed(request).await {
            Ok(response) => {
                let response_mods = inspect_rule
                    .as_ref()
                    .and_then(|r| r.response_modifications.as_ref())
                    .filter(|mods| !mods.is_empty());
                let response = match response_mods {
                    Some(mods) => {
                        if let Some(delay) = mods.delay_ms {
                            tokio::time::sleep(Duration::from_millis(delay)).await;
                        }
                        apply_response_modifications_http(response, mods)
                    }
                    None => response,
                };

                let mut model = capture_response(&response, &self.config);
                if let Some(message) = response_mods.and_then(|m| m.status_message.clone()) {
                    // The wire format has no reason phrase to rewrite; the
                    // override is visible on the captured model.
                    model.status_message = message;
                }

                let transaction = transaction.with_response(model);
                self.collector.on_response_received(transaction);
                Ok(response)
            }
            Err(err) => {
                let message = err.to_string();
                let transaction = transaction.with_error(message.clone());
                self.collector.on_failure(transaction, &message);
                // The caller's error-handling contract stays intact.
                Err(err)
            }
        }
    }

    async fn serve_mock(
        &self,
        transaction: NetworkTransaction,
        rule: &NetworkRule,
    ) -> anyhow::Result<Response<Bytes>> {
        let model = self.engine.create_mock_response(&transaction.request, rule);
        if let Some(delay) = rule
            .response_modifications
            .as_ref()
            .and_then(|mods| mods.delay_ms)
        {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let response = response_from_model(&model);
        let stored = capture_response(&response, &self.config);

        self.collector.on_request_sent(transaction.clone());
        self.collector.on_rule_applied(mock_application(rule));
        self.collector
            .on_response_received(transaction.with_response(stored));

        Ok(response)
    }
}

fn inspect_application(rule: &NetworkRule) -> RuleApplicationResult {
    let mut descriptions = Vec::new();
    if let Some(mods) = &rule.request_modifications {
        descriptions.extend(describe_request_modifications(mods));
    }
    if let Some(mods) = &rule.response_modifications {
        descriptions.extend(describe_response_modifications(mods));
    }
    RuleApplicationResult::new(rule, descriptions)
}

fn mock_application(rule: &NetworkRule) -> RuleApplicationResult {
    let mut descriptions = vec!["synthesize mock response".to_string()];
    if let Some(mods) = &rule.response_modifications {
        descriptions.extend(describe_response_modifications(mods));
    }
    RuleApplicationResult::new(rule, descriptions)
}

/// Build the stored request model: headers through the redaction filter,
/// body size-capped. Never fails; unreadable content becomes a placeholder.
pub(crate) fn capture_request(request: &Request<Bytes>, config: &JarvisConfig) -> NetworkRequest {
    let headers = capture_headers(request.headers());
    let mut model = NetworkRequest::new(
        request.uri().to_string(),
        HttpMethod::from_str_lossy(request.method().as_str()),
        headers,
    );
    let (body, size) = capture_body(request.body(), config);
    model.body = body;
    model.body_size = size;
    model
}

/// Build the stored response model, same redaction and cap as requests.
pub(crate) fn capture_response(response: &Response<Bytes>, config: &JarvisConfig) -> NetworkResponse {
    let headers = capture_headers(response.headers());
    let status = response.status();
    let mut model = NetworkResponse::new(
        status.as_u16(),
        status.canonical_reason().unwrap_or(""),
        headers,
    );
    let (body, size) = capture_body(response.body(), config);
    model.body = body;
    model.body_size = size;
    model
}

fn capture_headers(headers: &http::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if is_redacted_header(name.as_str()) {
                REDACTED_MARKER.to_string()
            } else {
                value.to_str().unwrap_or("").to_string()
            };
            (name.as_str().to_string(), value)
        })
        .collect()
}

fn capture_body(body: &Bytes, config: &JarvisConfig) -> (Option<String>, u64) {
    let size = body.len() as u64;
    if body.is_empty() {
        return (None, 0);
    }
    if body.len() > config.max_body_capture_bytes {
        return (Some(BODY_TOO_LARGE_PLACEHOLDER.to_string()), size);
    }
    match std::str::from_utf8(body) {
        Ok(text) => (Some(text.to_string()), size),
        Err(_) => (Some(BODY_UNREADABLE_PLACEHOLDER.to_string()), size),
    }
}

/// Apply request modifications to the wire object. Invalid header names or
/// values coming from a user rule are skipped, never fatal.
fn apply_request_modifications_http(
    request: Request<Bytes>,
    mods: &RequestModifications,
) -> Request<Bytes> {
    let (mut parts, mut body) = request.into_parts();

    for (name, value) in &mods.add_headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                parts.headers.append(name, value);
            }
            _ => tracing::warn!(header = %name, "skipping invalid header addition"),
        }
    }
    for (name, value) in &mods.modify_headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                parts.headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "skipping invalid header override"),
        }
    }
    for name in &mods.remove_headers {
        if let Ok(name) = HeaderName::try_from(name.as_str()) {
            parts.headers.remove(name);
        }
    }

    if let Some(url) = &mods.url {
        match url.parse() {
            Ok(uri) => parts.uri = uri,
            Err(_) => tracing::warn!(url = %url, "skipping invalid url override"),
        }
    }
    if let Some(method) = &mods.method {
        match http::Method::from_bytes(method.to_uppercase().as_bytes()) {
            Ok(method) => parts.method = method,
            Err(_) => tracing::warn!(method = %method, "skipping invalid method override"),
        }
    }
    if let Some(new_body) = &mods.body {
        body = Bytes::from(new_body.clone());
        sync_content_length(&mut parts.headers, body.len());
    }

    Request::from_parts(parts, body)
}

/// Apply response modifications to the wire object.
fn apply_response_modifications_http(
    response: Response<Bytes>,
    mods: &ResponseModifications,
) -> Response<Bytes> {
    let (mut parts, mut body) = response.into_parts();

    for (name, value) in &mods.add_headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                parts.headers.append(name, value);
            }
            _ => tracing::warn!(header = %name, "skipping invalid header addition"),
        }
    }
    for (name, value) in &mods.modify_headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                parts.headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "skipping invalid header override"),
        }
    }
    for name in &mods.remove_headers {
        if let Ok(name) = HeaderName::try_from(name.as_str()) {
            parts.headers.remove(name);
        }
    }

    if let Some(status) = mods.status_code {
        match StatusCode::from_u16(status) {
            Ok(status) => parts.status = status,
            Err(_) => tracing::warn!(status, "skipping invalid status override"),
        }
    }
    if let Some(new_body) = &mods.body {
        body = Bytes::from(new_body.clone());
        sync_content_length(&mut parts.headers, body.len());
    }

    Response::from_parts(parts, body)
}

fn sync_content_length(headers: &mut http::HeaderMap, len: usize) {
    if headers.contains_key(http::header::CONTENT_LENGTH) {
        if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
            headers.insert(http::header::CONTENT_LENGTH, value);
        }
    }
}

/// Materialize a protocol response from a mock model.
fn response_from_model(model: &NetworkResponse) -> Response<Bytes> {
    let body = Bytes::from(model.body.clone().unwrap_or_default());
    let mut response = Response::new(body);
    *response.status_mut() =
        StatusCode::from_u16(model.status_code).unwrap_or(StatusCode::OK);
    for (name, value) in &model.headers {
        match (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().append(name, value);
            }
            _ => tracing::warn!(header = %name, "skipping invalid mock header"),
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JarvisConfig {
        JarvisConfig::default()
    }

    fn request_with(headers: &[(&str, &str)], body: &str) -> Request<Bytes> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("https://api.example.com/v1/items?debug=1");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Bytes::from(body.to_string())).unwrap()
    }

    #[test]
    fn capture_redacts_sensitive_headers_case_insensitively() {
        let request = request_with(
            &[
                ("AUTHORIZATION", "Bearer secret"),
                ("Cookie", "session=1"),
                ("X-Api-Key", "k"),
                ("Accept", "application/json"),
            ],
            "",
        );
        let model = capture_request(&request, &config());
        assert_eq!(model.header("authorization"), Some(REDACTED_MARKER));
        assert_eq!(model.header("cookie"), Some(REDACTED_MARKER));
        assert_eq!(model.header("x-api-key"), Some(REDACTED_MARKER));
        assert_eq!(model.header("accept"), Some("application/json"));
    }

    #[test]
    fn capture_caps_large_bodies() {
        let cfg = JarvisConfig {
            max_body_capture_bytes: 8,
        };
        let request = request_with(&[], "0123456789");
        let model = capture_request(&request, &cfg);
        assert_eq!(model.body.as_deref(), Some(BODY_TOO_LARGE_PLACEHOLDER));
        assert_eq!(model.body_size, 10);

        let small = request_with(&[], "0123");
        let model = capture_request(&small, &cfg);
        assert_eq!(model.body.as_deref(), Some("0123"));
        assert_eq!(model.body_size, 4);
    }

    #[test]
    fn capture_replaces_undecodable_bodies() {
        let request = Request::builder()
            .method("POST")
            .uri("https://api.example.com/blob")
            .body(Bytes::from_static(&[0xff, 0xfe, 0x00]))
            .unwrap();
        let model = capture_request(&request, &config());
        assert_eq!(model.body.as_deref(), Some(BODY_UNREADABLE_PLACEHOLDER));
        assert_eq!(model.body_size, 3);
    }

    #[test]
    fn request_rewrite_applies_header_and_body_ops() {
        let mut mods = RequestModifications::default();
        mods.add_headers.insert("X-Debug".into(), "1".into());
        mods.modify_headers.insert("Accept".into(), "text/plain".into());
        mods.remove_headers.push("Cookie".into());
        mods.body = Some("rewritten".into());
        mods.method = Some("put".into());

        let request = request_with(
            &[
                ("Accept", "application/json"),
                ("Cookie", "session=1"),
                ("Content-Length", "4"),
            ],
            "orig",
        );
        let rewritten = apply_request_modifications_http(request, &mods);
        assert_eq!(rewritten.method(), http::Method::PUT);
        assert_eq!(rewritten.headers().get("X-Debug").unwrap(), "1");
        assert_eq!(rewritten.headers().get("Accept").unwrap(), "text/plain");
        assert!(rewritten.headers().get("Cookie").is_none());
        assert_eq!(rewritten.headers().get("Content-Length").unwrap(), "9");
        assert_eq!(rewritten.body().as_ref(), b"rewritten");
    }

    #[test]
    fn invalid_rule_headers_never_break_the_rewrite() {
        let mut mods = RequestModifications::default();
        mods.add_headers.insert("bad name\n".into(), "x".into());
        mods.url = Some("://nonsense".into());

        let request = request_with(&[], "");
        let rewritten = apply_request_modifications_http(request, &mods);
        assert_eq!(rewritten.uri(), "https://api.example.com/v1/items?debug=1");
    }

    #[test]
    fn mock_model_materializes_protocol_response() {
        let mut model = NetworkResponse::new(
            201,
            "Created",
            vec![("Content-Type".into(), "application/json".into())],
        );
        model.body = Some("{\"id\":1}".into());
        let response = response_from_model(&model);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        assert_eq!(response.body().as_ref(), b"{\"id\":1}");
    }

    #[test]
    fn builder_fails_fast_on_missing_dependencies() {
        assert!(matches!(
            Interceptor::builder().build(),
            Err(ConfigError::MissingRuleEngine)
        ));
    }
}
