//! Finchat Engine Library
//!
//! This library provides the core functionality of the finchat engine:
//! the message-orchestration pipeline that turns one incoming user
//! message into a classified, optionally researched, synthesized and
//! persisted conversation turn. It is used by both the main binary and
//! integration tests.

/// Configuration management module
pub mod config;

/// Error types module
pub mod error;

/// Database persistence module
pub mod db;

/// Query classifier module
pub mod classifier;

/// Context window builder module
pub mod context;

/// Evidence retrieval module
pub mod search;

/// Chat model provider abstraction layer
pub mod llm;

/// Synthesis engine module
pub mod synthesis;

/// Turn orchestrator module
pub mod orchestrator;

/// HTTP API surface
pub mod api;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
