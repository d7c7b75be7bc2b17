//! The text-completion oracle seam.

use crate::error::Result;
use async_trait::async_trait;

/// A text-completion service: one instruction in, free text out.
///
/// Implementations keep no conversation state and do not retry. Every
/// failure is reported as [`Error::OracleUnavailable`](crate::Error::OracleUnavailable).
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, instruction: &str) -> Result<String>;
}
