//! # Jarvis Core
//!
//! Network inspection and interception engine for the Jarvis in-app developer
//! tools SDK.
//!
//! ## Features
//!
//! - HTTP client interception with full transaction capture
//! - Declarative rules: rewrite requests/responses (INSPECT) or synthesize
//!   mock responses that skip the network entirely (MOCK)
//! - Sensitive-header redaction and size-capped body capture
//! - Fire-and-forget persistence that never blocks the network path
//! - Rule import/export
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Host HTTP client                      │
//! ├──────────────────────────────────────────────────────────┤
//! │                    Jarvis Core (Rust)                     │
//! │  ┌─────────────┐  ┌────────────┐  ┌─────────────────┐    │
//! │  │ Interceptor │──│ RuleEngine │──│    RuleStore    │    │
//! │  │             │  └────────────┘  └─────────────────┘    │
//! │  │             │  ┌────────────┐  ┌─────────────────┐    │
//! │  │             │──│ Collector  │──│ Repo (SQLite)   │    │
//! │  └─────────────┘  └────────────┘  └─────────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod collector;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod models;
pub mod rules;
pub mod storage;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize console logging, resolving the level from `RUST_LOG`.
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let level = match std::env::var("RUST_LOG").as_deref() {
        Ok("trace") => tracing::level_filters::LevelFilter::TRACE,
        Ok("debug") => tracing::level_filters::LevelFilter::DEBUG,
        Ok("warn") | Ok("warning") => tracing::level_filters::LevelFilter::WARN,
        Ok("error") => tracing::level_filters::LevelFilter::ERROR,
        _ => tracing::level_filters::LevelFilter::INFO,
    };
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
}
