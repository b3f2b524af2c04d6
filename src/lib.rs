//! `glimpse` is the library backing the `glimpse` CLI binary.
//!
//! It creates time-delayed reveal sessions: each session holds one or more
//! randomly chosen target images, each identified by a short code, that stay
//! hidden until the session's reveal time (or a forced reveal).
//! - Code generation, validation and normalization
//! - Typed session records and the reveal transition
//! - A file-per-session JSON store
//! - Remote image providers (Unsplash, Google Street View)
//! - JSON views that never expose a hidden target's image

/// Command orchestration used by the CLI.
pub mod commands;
/// Target code generation, validation and normalization.
pub mod code;
/// Process configuration resolved at startup.
pub mod config;
/// Random session identifiers.
pub mod id;
/// Terminal views and Markdown summaries.
pub mod render;
/// Session and target records.
pub mod session;
/// Remote image providers.
pub mod source;
/// File-per-session storage.
pub mod store;
/// Redacted JSON views of sessions.
pub mod view;
