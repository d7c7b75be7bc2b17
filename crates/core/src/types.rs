//! Domain types for a presentation outline.
//!
//! A [`Document`] is never edited in place by callers: every change produces a
//! new value, and the previous one is dropped once the new one is accepted.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Value of the `type` discriminator on the wire.
pub const PRESENTATION_MARKER: &str = "presentation";

/// A presentation outline: a title and its slides in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "presentation")]
pub struct Document {
    /// Presentation title. Empty means no title section is rendered.
    pub title: String,

    /// Slides in presentation order.
    pub slides: Vec<Slide>,
}

impl Document {
    /// Create an empty document with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            slides: Vec::new(),
        }
    }

    /// Builder-style slide append, mostly useful for constructing fixtures.
    pub fn with_slide(mut self, slide: Slide) -> Self {
        self.slides.push(slide);
        self
    }

    /// Number of slides, not counting the title section.
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Look up a slide by its 1-based position as users refer to it.
    pub fn slide_at(&self, number: usize) -> Option<&Slide> {
        number.checked_sub(1).and_then(|idx| self.slides.get(idx))
    }

    /// New document with `slides[index]` replaced.
    pub fn with_slide_replaced(&self, index: usize, slide: Slide) -> Option<Self> {
        let mut next = self.clone();
        *next.slides.get_mut(index)? = slide;
        Some(next)
    }

    /// New document with `slides[index]` removed; later slides shift down.
    pub fn with_slide_removed(&self, index: usize) -> Option<Self> {
        if index >= self.slides.len() {
            return None;
        }
        let mut next = self.clone();
        next.slides.remove(index);
        Some(next)
    }

    /// New document with `slide` inserted at `position`, or appended when
    /// `position` is `None` or past the end.
    pub fn with_slide_inserted(&self, position: Option<usize>, slide: Slide) -> Self {
        let mut next = self.clone();
        let at = position.unwrap_or(next.slides.len()).min(next.slides.len());
        next.slides.insert(at, slide);
        next
    }

    /// Serialize to the pretty-printed wire form.
    pub fn to_pretty_json(&self) -> String {
        // Only strings and sequences: serialization cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ValidationError::new(format!("not valid JSON: {}", e)))?;
        validate(&value)
    }
}

impl TryFrom<&Value> for Document {
    type Error = ValidationError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        validate(value)
    }
}

/// A single slide: a heading and its bullet points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    /// Slide heading.
    pub title: String,

    /// Bullet points in order.
    #[serde(default)]
    pub content: Vec<String>,
}

impl Slide {
    /// Create a slide with a title and no bullets.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: Vec::new(),
        }
    }

    /// Add a bullet point.
    pub fn with_point(mut self, point: impl Into<String>) -> Self {
        self.content.push(point.into());
        self
    }

    /// Prompt prefix for editing the slide at 1-based position `number`.
    pub fn edit_prompt(number: usize) -> String {
        format!("Edit slide {} to ", number)
    }
}

/// Whether a parsed payload looks like it is meant to be a document.
///
/// Either the presentation marker or a `slides` field is enough.
pub fn is_document_candidate(value: &Value) -> bool {
    match value.as_object() {
        Some(obj) => {
            obj.get("type").and_then(Value::as_str) == Some(PRESENTATION_MARKER)
                || obj.contains_key("slides")
        }
        None => false,
    }
}

/// Validate an untrusted payload against the document schema.
pub fn validate(candidate: &Value) -> Result<Document, ValidationError> {
    let obj = candidate
        .as_object()
        .ok_or_else(|| ValidationError::new("payload is not an object"))?;

    let title = match obj.get("title") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(ValidationError::new("`title` must be a string")),
    };

    let slides = match obj.get("slides") {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ValidationError::new("`slides` must be an array")),
        None => return Err(ValidationError::new("missing `slides` field")),
    };

    let slides = slides
        .iter()
        .enumerate()
        .map(|(idx, item)| validate_slide(idx + 1, item))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Document { title, slides })
}

fn validate_slide(number: usize, item: &Value) -> Result<Slide, ValidationError> {
    let obj = item
        .as_object()
        .ok_or_else(|| ValidationError::new(format!("slide {} is not an object", number)))?;

    let title = match obj.get("title") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(ValidationError::new(format!(
                "slide {} `title` must be a string",
                number
            )))
        }
        None => {
            return Err(ValidationError::new(format!(
                "slide {} is missing `title`",
                number
            )))
        }
    };

    let content = validate_content(number, obj)?;

    Ok(Slide { title, content })
}

fn validate_content(number: usize, obj: &Map<String, Value>) -> Result<Vec<String>, ValidationError> {
    match obj.get("content") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(points)) => points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                p.as_str().map(str::to_string).ok_or_else(|| {
                    ValidationError::new(format!(
                        "slide {} bullet {} must be a string",
                        number,
                        i + 1
                    ))
                })
            })
            .collect(),
        Some(_) => Err(ValidationError::new(format!(
            "slide {} `content` must be an array",
            number
        ))),
    }
}
