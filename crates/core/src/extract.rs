//! Locating a document payload inside free-form oracle text.
//!
//! The oracle is asked to reply with nothing but JSON, but replies often carry
//! prose or markdown fences around it, and conversational answers carry no
//! payload at all. Extraction never fails: anything that does not yield a valid
//! document comes back as a plain reply.

use crate::error::{Error, Result, ValidationError};
use crate::types::{is_document_candidate, validate, Document};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Markdown code fences, with or without a `json` info string.
static CODE_FENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\n?").unwrap());

/// Outcome of interpreting one oracle reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// The reply carried a valid document that replaces the current one.
    DocumentUpdate(Document),

    /// The reply is conversational text, returned unchanged.
    ///
    /// `rejected` is set when a payload was found and classified as a document
    /// but failed validation.
    PlainReply {
        text: String,
        rejected: Option<ValidationError>,
    },
}

impl Extraction {
    fn plain(text: &str) -> Self {
        Self::PlainReply {
            text: text.to_string(),
            rejected: None,
        }
    }

    /// The new document, if this is an update.
    pub fn document(&self) -> Option<&Document> {
        match self {
            Self::DocumentUpdate(doc) => Some(doc),
            Self::PlainReply { .. } => None,
        }
    }

    /// Whether this reply replaces the current document.
    pub fn is_update(&self) -> bool {
        matches!(self, Self::DocumentUpdate(_))
    }

    /// Validation failure of a payload that looked like a document.
    pub fn rejection(&self) -> Option<&ValidationError> {
        match self {
            Self::PlainReply { rejected, .. } => rejected.as_ref(),
            Self::DocumentUpdate(_) => None,
        }
    }
}

/// Remove markdown code fences and surrounding whitespace from oracle text.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE_REGEX.replace_all(text, "").trim().to_string()
}

/// Interpret raw oracle text as either a document update or a plain reply.
pub fn extract(raw: &str) -> Extraction {
    let Some(candidate) = locate_candidate(raw) else {
        log::debug!("No presentation payload in reply ({} bytes)", raw.len());
        return Extraction::plain(raw);
    };

    match validate(&candidate) {
        Ok(document) => {
            log::debug!(
                "Extracted presentation \"{}\" with {} slides",
                document.title,
                document.slides.len()
            );
            Extraction::DocumentUpdate(document)
        }
        Err(e) => {
            log::warn!("Rejected presentation payload: {}", e);
            Extraction::PlainReply {
                text: raw.to_string(),
                rejected: Some(e),
            }
        }
    }
}

/// Extract a document from a text blob, failing if there is none.
///
/// Used where a document is required, such as rendering from pasted text.
pub fn extract_document(text: &str) -> Result<Document> {
    let candidate = locate_candidate(text)
        .ok_or_else(|| ValidationError::new("no presentation payload found"))?;
    validate(&candidate).map_err(Error::from)
}

/// Find the first top-level JSON object in `text` that looks like a document.
///
/// Each `{` is tried as the start of a JSON value. Objects that parse but are
/// not document candidates are skipped whole, so braces nested inside them are
/// not retried. Braces inside bullet strings never confuse the scan because a
/// complete object is parsed by a real JSON parser.
fn locate_candidate(text: &str) -> Option<Value> {
    let mut pos = 0;

    while let Some(offset) = text[pos..].find('{') {
        let start = pos + offset;
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();

        match stream.next() {
            Some(Ok(value)) if is_document_candidate(&value) => return Some(value),
            Some(Ok(_)) => pos = start + stream.byte_offset().max(1),
            _ => pos = start + 1,
        }
    }

    None
}
