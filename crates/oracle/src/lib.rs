//! Gemini-backed [`Oracle`](deck_core::Oracle) for the deck editor.

pub mod client;
pub mod types;

pub use client::{GeminiClient, LlmError, OracleConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use types::resolve_model;
