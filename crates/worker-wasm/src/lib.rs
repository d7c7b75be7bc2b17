//! WASM-compatible wrapper for deck rendering and oracle reply handling.
//!
//! This crate exposes rendering and reply interpretation to JavaScript
//! hosts (browsers and edge workers). The host performs the oracle call
//! itself and passes the reply text back in.

use deck_core::session::status_message;
use deck_core::{extract, strip_code_fences, validate, Document, Extraction, InstructionBuilder};
use deck_pptx::{DeckWriter, DEFAULT_FILENAME, PPTX_MIME_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages in the console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// A rendered deck, ready for download.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    /// Base64-encoded PPTX bytes.
    pub pptx: String,
    /// Number of slides in the presentation (the title section is not counted).
    pub slide_count: usize,
    pub filename: String,
    pub mime_type: String,
    pub message: String,
}

/// How an oracle reply was understood.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResult {
    /// `"update"` when the reply carried a presentation, `"reply"` otherwise.
    pub kind: String,
    /// The new presentation, on update.
    pub presentation: Option<Document>,
    /// Text to show in the chat: a status line on update, the reply otherwise.
    pub message: String,
    /// Why a presentation-like payload was not accepted.
    pub rejected: Option<String>,
}

/// Render a presentation to a PPTX file.
///
/// # Arguments
/// * `slide_data` - The presentation object, or a string containing one
///
/// # Returns
/// A JavaScript object `{ pptx, slideCount, filename, mimeType, message }`,
/// or throws on invalid input.
#[wasm_bindgen]
pub fn render_presentation(slide_data: JsValue) -> Result<JsValue, JsValue> {
    let input = match slide_data.as_string() {
        Some(text) => Value::String(text),
        None => serde_wasm_bindgen::from_value(slide_data)
            .map_err(|e| JsValue::from_str(&format!("Invalid slide data: {}", e)))?,
    };

    let result = render_presentation_impl(&input).map_err(|e| JsValue::from_str(&e))?;

    to_js(&result)
}

fn render_presentation_impl(input: &Value) -> Result<RenderResult, String> {
    let document = match input {
        Value::String(text) => deck_core::extract_document(text).map_err(|e| e.to_string())?,
        value => validate(value).map_err(|e| format!("Invalid presentation: {}", e))?,
    };

    let pptx = DeckWriter::new()
        .render_base64(&document)
        .map_err(|e| e.to_string())?;

    Ok(RenderResult {
        pptx,
        slide_count: document.slide_count(),
        filename: DEFAULT_FILENAME.to_string(),
        mime_type: PPTX_MIME_TYPE.to_string(),
        message: "Presentation generated successfully".to_string(),
    })
}

/// Interpret the text returned by the oracle.
///
/// # Arguments
/// * `text` - The raw reply
/// * `has_presentation` - Whether a presentation existed before the request
#[wasm_bindgen]
pub fn interpret_reply(text: &str, has_presentation: bool) -> Result<JsValue, JsValue> {
    to_js(&interpret_reply_impl(text, has_presentation))
}

fn interpret_reply_impl(text: &str, has_presentation: bool) -> ReplyResult {
    match extract(&strip_code_fences(text)) {
        Extraction::DocumentUpdate(document) => ReplyResult {
            kind: "update".to_string(),
            message: status_message(has_presentation, &document),
            presentation: Some(document),
            rejected: None,
        },
        Extraction::PlainReply { text, rejected } => ReplyResult {
            kind: "reply".to_string(),
            presentation: None,
            message: text,
            rejected: rejected.map(|r| r.reason),
        },
    }
}

/// Build the instruction to send to the oracle for `message`.
///
/// # Arguments
/// * `message` - The user's request
/// * `current_presentation` - The current presentation, or null/undefined
#[wasm_bindgen]
pub fn build_instruction(message: &str, current_presentation: JsValue) -> Result<String, JsValue> {
    let current = if current_presentation.is_null() || current_presentation.is_undefined() {
        None
    } else {
        Some(
            serde_wasm_bindgen::from_value(current_presentation)
                .map_err(|e| JsValue::from_str(&format!("Invalid presentation: {}", e)))?,
        )
    };

    build_instruction_impl(message, current.as_ref()).map_err(|e| JsValue::from_str(&e))
}

fn build_instruction_impl(message: &str, current: Option<&Value>) -> Result<String, String> {
    let document = current
        .map(validate)
        .transpose()
        .map_err(|e| format!("Invalid presentation: {}", e))?;

    Ok(InstructionBuilder::new(document.as_ref()).build(message))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value
        .serialize(&serializer)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deck() -> Value {
        json!({
            "type": "presentation",
            "title": "Quarterly Review",
            "slides": [
                { "title": "Revenue", "content": ["Up 12%"] },
                { "title": "Hiring", "content": [] }
            ]
        })
    }

    #[test]
    fn test_render_object() {
        let result = render_presentation_impl(&deck()).unwrap();

        assert_eq!(result.slide_count, 2);
        assert_eq!(result.filename, "presentation.pptx");
        assert_eq!(result.message, "Presentation generated successfully");
        // Base64 of a ZIP local file header ("PK\x03\x04").
        assert!(result.pptx.starts_with("UEsDB"));
    }

    #[test]
    fn test_render_text_blob() {
        let text = format!("Sure!\n{}\nEnjoy.", deck());
        let result = render_presentation_impl(&Value::String(text)).unwrap();
        assert_eq!(result.slide_count, 2);
    }

    #[test]
    fn test_render_rejects_invalid() {
        let err = render_presentation_impl(&json!({ "slides": 3 })).unwrap_err();
        assert!(err.starts_with("Invalid presentation"));
        assert!(render_presentation_impl(&Value::String("no deck here".into())).is_err());
    }

    #[test]
    fn test_render_result_field_names() {
        let result = render_presentation_impl(&deck()).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("slideCount").is_some());
        assert!(value.get("mimeType").is_some());
    }

    #[test]
    fn test_interpret_update() {
        let reply = format!("```json\n{}\n```", deck());

        let created = interpret_reply_impl(&reply, false);
        assert_eq!(created.kind, "update");
        assert_eq!(
            created.message,
            "Presentation created successfully! I've generated 2 slides for \"Quarterly Review\"."
        );
        assert_eq!(created.presentation.unwrap().slides[0].title, "Revenue");

        let updated = interpret_reply_impl(&reply, true);
        assert_eq!(
            updated.message,
            "Presentation updated! Your presentation now has 2 slides."
        );
    }

    #[test]
    fn test_interpret_plain_and_rejected() {
        let plain = interpret_reply_impl("What audience is this for?", true);
        assert_eq!(plain.kind, "reply");
        assert_eq!(plain.message, "What audience is this for?");
        assert!(plain.rejected.is_none());

        let rejected = interpret_reply_impl(r#"{"slides": {"title": "x"}}"#, true);
        assert_eq!(rejected.kind, "reply");
        assert!(rejected.presentation.is_none());
        assert!(rejected.rejected.is_some());
    }

    #[test]
    fn test_build_instruction() {
        let fresh = build_instruction_impl("Make a deck about owls", None).unwrap();
        assert!(fresh.contains("No presentation exists yet"));
        assert!(fresh.contains("Make a deck about owls"));

        let editing = build_instruction_impl("remove slide 2", Some(&deck())).unwrap();
        assert!(editing.contains("\"Hiring\""));
        assert!(!editing.contains("No presentation exists yet"));

        assert!(build_instruction_impl("x", Some(&json!([1, 2]))).is_err());
    }
}
