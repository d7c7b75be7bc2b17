//! Plain-text outline preview.
//!
//! Shows the current document the way a reviewer reads it before rendering:
//! the presentation title, the slide count, then each slide with its number,
//! heading and bullets, separated by blank lines.

use crate::types::Document;

/// Formatter for the outline preview.
#[derive(Debug, Clone)]
pub struct OutlineFormatter {
    /// Bullet marker placed before each point.
    bullet: String,
}

impl Default for OutlineFormatter {
    fn default() -> Self {
        Self {
            bullet: "-".to_string(),
        }
    }
}

impl OutlineFormatter {
    /// Create a formatter using `-` bullets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom bullet marker.
    pub fn with_bullet(mut self, bullet: impl Into<String>) -> Self {
        self.bullet = bullet.into();
        self
    }

    /// Format a document as an outline.
    ///
    /// # Example output
    /// ```text
    /// AI in Healthcare
    /// 2 slides
    ///
    /// Slide 1: Introduction
    ///   - What is AI
    ///
    /// Slide 2: Benefits
    /// ```
    pub fn format(&self, document: &Document) -> String {
        let title = if document.title.is_empty() {
            "Presentation"
        } else {
            document.title.as_str()
        };
        let count = document.slides.len();
        let mut sections = vec![format!(
            "{}\n{} {}",
            title,
            count,
            if count == 1 { "slide" } else { "slides" }
        )];

        for (idx, slide) in document.slides.iter().enumerate() {
            let mut lines = vec![format!("Slide {}: {}", idx + 1, slide.title)];
            lines.extend(
                slide
                    .content
                    .iter()
                    .map(|point| format!("  {} {}", self.bullet, point)),
            );
            sections.push(lines.join("\n"));
        }

        sections.join("\n\n")
    }

    /// Format and add a trailing newline.
    pub fn format_with_newline(&self, document: &Document) -> String {
        format!("{}\n", self.format(document))
    }
}
