//! Request/response transaction model.
//!
//! A transaction is one captured request lifecycle, keyed by a unique id. It
//! starts PENDING and advances to exactly one terminal state via
//! [`NetworkTransaction::with_response`] or [`NetworkTransaction::with_error`];
//! both consume the old value and return a new one, so in-flight state is
//! never mutated behind the caller's back.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::{NetworkRequest, NetworkResponse};

/// State of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Request has been sent, no outcome yet
    Pending,
    /// A response (real or mocked) was produced
    Completed,
    /// The underlying call failed
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkTransaction {
    /// Unique identifier for this transaction
    pub id: String,
    pub request: NetworkRequest,
    /// Present once the transaction completed
    pub response: Option<NetworkResponse>,
    /// Milliseconds since epoch
    pub start_time: i64,
    /// Set by the terminal transitions, milliseconds since epoch
    pub end_time: Option<i64>,
    pub status: TransactionStatus,
    /// Failure message, set only by `with_error`
    pub error: Option<String>,
}

impl NetworkTransaction {
    pub fn new(request: NetworkRequest) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            start_time: request.timestamp,
            request,
            response: None,
            end_time: None,
            status: TransactionStatus::Pending,
            error: None,
        }
    }

    /// Terminal transition: attach the response and mark completed.
    pub fn with_response(self, response: NetworkResponse) -> Self {
        let end_time = response.timestamp.max(self.start_time);
        Self {
            response: Some(response),
            end_time: Some(end_time),
            status: TransactionStatus::Completed,
            ..self
        }
    }

    /// Terminal transition: record the failure and mark failed.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            end_time: Some(Utc::now().timestamp_millis().max(self.start_time)),
            status: TransactionStatus::Failed,
            ..self
        }
    }

    /// Wall-clock duration; defined iff a terminal transition has happened.
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time.map(|end| end - self.start_time)
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == TransactionStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HttpMethod;

    fn request() -> NetworkRequest {
        NetworkRequest::new("https://example.com/api", HttpMethod::Get, Vec::new())
    }

    #[test]
    fn with_response_is_terminal() {
        let tx = NetworkTransaction::new(request());
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert!(tx.duration_ms().is_none());

        let tx = tx.with_response(NetworkResponse::new(200, "OK", Vec::new()));
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert!(tx.status.is_terminal());
        assert!(tx.end_time.is_some());
        assert!(tx.duration_ms().is_some());
    }

    #[test]
    fn with_error_is_terminal() {
        let tx = NetworkTransaction::new(request()).with_error("connection reset");
        assert_eq!(tx.status, TransactionStatus::Failed);
        assert!(tx.end_time.is_some());
        assert_eq!(tx.error.as_deref(), Some("connection reset"));
        assert!(tx.duration_ms().unwrap() >= 0);
    }

    #[test]
    fn transitions_never_return_to_pending() {
        let tx = NetworkTransaction::new(request())
            .with_error("timed out")
            .with_response(NetworkResponse::new(200, "OK", Vec::new()));
        assert!(tx.status.is_terminal());
    }
}
