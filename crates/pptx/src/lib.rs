//! PPTX (Office Open XML) renderer for presentation outlines.
//!
//! Writes a document as a .pptx file (a ZIP archive of XML parts) and reads
//! rendered files back for inspection.

pub mod layout;
mod parts;
pub mod reader;
pub mod writer;

pub use layout::{DeckStyle, Section, TextBlock};
pub use reader::{DeckReader, RenderedSection};
pub use writer::{DeckWriter, DEFAULT_FILENAME, PPTX_MIME_TYPE};
