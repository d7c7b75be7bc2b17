//! Instruction text sent to the oracle for one chat turn.
//!
//! The oracle does the actual editing, so the rules below are the whole edit
//! contract as far as the oracle is concerned. [`crate::contract`] checks the
//! result against the same rules locally.

use crate::session::{ChatMessage, Role};
use crate::types::Document;
use std::fmt::Write;

/// Marker used in place of the current document before one exists.
pub const NO_PRESENTATION: &str = "No presentation exists yet";

const PREAMBLE: &str = "You are an AI assistant that helps create and edit PowerPoint presentations.

IMPORTANT RULES:
1. When creating a NEW presentation, generate slide content from scratch
2. When EDITING an EXISTING presentation, preserve all slides and only modify what the user asks
3. If user says \"edit slide 2\" or \"update slide 3\", modify ONLY that specific slide
4. Always return the COMPLETE presentation JSON with ALL slides (edited and unedited)";

const WIRE_SHAPE: &str = r#"Format your response as a valid JSON object:
{
 "type": "presentation",
 "title": "Presentation Title",
 "slides": [
   {
     "title": "Slide Title",
     "content": ["Point 1", "Point 2", "Point 3"]
   }
 ]
}"#;

const EDITING_RULES: &str = "EDITING INSTRUCTIONS:
- Slide numbers are 1-based: \"slide N\" is slides[N-1]
- If user says \"edit slide 2\", modify only slide at index 1 (slides[1])
- If user says \"change slide 3 title\", update only the title of slides[2]
- If user says \"add a slide\", append a new slide to the end of the array unless a position is given
- If user says \"remove slide 2\", remove slides[1]; later slides move up by one
- Copy every slide you were not asked to change exactly as it is, field for field
- Always return ALL slides in the presentation, not just the edited one";

const OUTPUT_RULE: &str = "CRITICAL: Return ONLY a valid JSON object, nothing else. No explanations, no markdown, no extra text.";

/// Builds the instruction for a single turn.
#[derive(Debug, Clone)]
pub struct InstructionBuilder<'a> {
    current: Option<&'a Document>,
    history: &'a [ChatMessage],
    history_limit: usize,
}

impl<'a> InstructionBuilder<'a> {
    /// Start an instruction against the current document, if any.
    pub fn new(current: Option<&'a Document>) -> Self {
        Self {
            current,
            history: &[],
            history_limit: 0,
        }
    }

    /// Include up to `limit` of the most recent transcript messages.
    pub fn with_history(mut self, history: &'a [ChatMessage], limit: usize) -> Self {
        self.history = history;
        self.history_limit = limit;
        self
    }

    /// Render the instruction for `request`.
    pub fn build(&self, request: &str) -> String {
        let mut out = String::with_capacity(2048);

        out.push_str(PREAMBLE);
        out.push_str("\n\nCurrent Presentation Data:\n");
        match self.current {
            Some(doc) => out.push_str(&doc.to_pretty_json()),
            None => out.push_str(NO_PRESENTATION),
        }
        out.push_str("\n\n");
        out.push_str(WIRE_SHAPE);
        out.push_str("\n\n");
        out.push_str(EDITING_RULES);
        out.push_str("\n\n");

        let skip = self.history.len().saturating_sub(self.history_limit);
        let recent = &self.history[skip..];
        if !recent.is_empty() {
            out.push_str("Conversation so far:\n");
            for message in recent {
                let speaker = match message.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                };
                // Writing to a String is infallible.
                let _ = writeln!(out, "{}: {}", speaker, message.content);
            }
            out.push('\n');
        }

        out.push_str("User message: ");
        out.push_str(request);
        out.push_str("\n\n");
        out.push_str(OUTPUT_RULE);

        out
    }
}

/// Shorthand for an instruction without transcript history.
pub fn build_instruction(current: Option<&Document>, request: &str) -> String {
    InstructionBuilder::new(current).build(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Slide;

    #[test]
    fn test_creation_mode_uses_marker() {
        let text = build_instruction(None, "Create a deck about bees");
        assert!(text.contains("Current Presentation Data:\nNo presentation exists yet"));
        assert!(text.contains("User message: Create a deck about bees"));
        assert!(text.ends_with(OUTPUT_RULE));
    }

    #[test]
    fn test_edit_mode_embeds_document() {
        let doc = Document::new("Bees").with_slide(Slide::new("Hives").with_point("Wax"));
        let text = build_instruction(Some(&doc), "edit slide 1");
        assert!(!text.contains(NO_PRESENTATION));
        assert!(text.contains(&doc.to_pretty_json()));
        assert!(text.contains("\"type\": \"presentation\""));
    }

    #[test]
    fn test_contains_every_rule() {
        let text = build_instruction(None, "hi");
        for needle in [
            "generate slide content from scratch",
            "COMPLETE presentation JSON",
            "slides[N-1]",
            "update only the title of slides[2]",
            "append a new slide",
            "remove slides[1]",
            "No explanations, no markdown",
        ] {
            assert!(text.contains(needle), "missing rule: {}", needle);
        }
    }

    #[test]
    fn test_history_is_limited_to_recent_messages() {
        let history = vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("reply one"),
            ChatMessage::user("second"),
        ];

        let text = InstructionBuilder::new(None)
            .with_history(&history, 2)
            .build("third");
        assert!(text.contains("Conversation so far:\nAssistant: reply one\nUser: second\n"));
        assert!(!text.contains("User: first"));

        let text = InstructionBuilder::new(None).with_history(&history, 0).build("third");
        assert!(!text.contains("Conversation so far"));
    }
}
