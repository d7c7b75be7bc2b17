//! Placement of a document onto sections.
//!
//! A section is one slide of the output file. The title section (when the
//! document has a title) comes first, followed by one section per slide in
//! document order. Nothing is skipped, merged or reordered.

use deck_core::Document;

/// English Metric Units per inch.
pub const EMU_PER_INCH: i64 = 914_400;

/// Heading used for slides whose title is empty.
pub const FALLBACK_SLIDE_TITLE: &str = "Slide Title";

/// Colours, font sizes and slide dimensions used by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckStyle {
    /// Slide width in EMU (default 10in).
    pub slide_width: i64,
    /// Slide height in EMU (default 5.625in, 16:9).
    pub slide_height: i64,
    /// Background of the title section.
    pub title_background: String,
    /// Text colour on the title section.
    pub title_color: String,
    /// Title font size in points.
    pub title_font_size: u32,
    /// Background of slide sections.
    pub slide_background: String,
    /// Slide heading colour.
    pub heading_color: String,
    /// Slide heading font size in points.
    pub heading_font_size: u32,
    /// Bullet text colour.
    pub bullet_color: String,
    /// Bullet font size in points.
    pub bullet_font_size: u32,
}

impl Default for DeckStyle {
    fn default() -> Self {
        Self {
            slide_width: 10 * EMU_PER_INCH,
            slide_height: 5_143_500,
            title_background: "1F4788".to_string(),
            title_color: "FFFFFF".to_string(),
            title_font_size: 44,
            slide_background: "FFFFFF".to_string(),
            heading_color: "1F4788".to_string(),
            heading_font_size: 32,
            bullet_color: "333333".to_string(),
            bullet_font_size: 18,
        }
    }
}

/// Position and size of a shape, in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

/// Horizontal alignment of a text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// Styling shared by every run of a text block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStyle {
    pub font_size: u32,
    pub color: String,
    pub bold: bool,
}

/// A text block placed on a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextBlock {
    /// One paragraph of heading text.
    Heading {
        name: &'static str,
        frame: Frame,
        text: String,
        align: Align,
        style: RunStyle,
    },
    /// A bulleted list; may hold no bullets at all.
    Bullets {
        name: &'static str,
        frame: Frame,
        points: Vec<String>,
        style: RunStyle,
    },
}

/// One output slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub background: String,
    pub blocks: Vec<TextBlock>,
}

/// Lay out `document` as sections using `style`.
pub fn layout(document: &Document, style: &DeckStyle) -> Vec<Section> {
    let margin = EMU_PER_INCH / 2;
    // Blocks span 90% of the slide width.
    let width = style.slide_width * 9 / 10;

    let mut sections = Vec::with_capacity(document.slides.len() + 1);

    if !document.title.is_empty() {
        sections.push(Section {
            background: style.title_background.clone(),
            blocks: vec![TextBlock::Heading {
                name: "Title",
                frame: Frame {
                    x: margin,
                    y: style.slide_height * 2 / 5,
                    cx: width,
                    cy: EMU_PER_INCH,
                },
                text: document.title.clone(),
                align: Align::Center,
                style: RunStyle {
                    font_size: style.title_font_size,
                    color: style.title_color.clone(),
                    bold: true,
                },
            }],
        });
    }

    for slide in &document.slides {
        let heading = if slide.title.is_empty() {
            FALLBACK_SLIDE_TITLE.to_string()
        } else {
            slide.title.clone()
        };

        sections.push(Section {
            background: style.slide_background.clone(),
            blocks: vec![
                TextBlock::Heading {
                    name: "Heading",
                    frame: Frame {
                        x: margin,
                        y: margin,
                        cx: width,
                        cy: EMU_PER_INCH * 3 / 4,
                    },
                    text: heading,
                    align: Align::Left,
                    style: RunStyle {
                        font_size: style.heading_font_size,
                        color: style.heading_color.clone(),
                        bold: true,
                    },
                },
                TextBlock::Bullets {
                    name: "Body",
                    frame: Frame {
                        x: margin,
                        y: EMU_PER_INCH * 3 / 2,
                        cx: width,
                        cy: EMU_PER_INCH * 4,
                    },
                    points: slide.content.clone(),
                    style: RunStyle {
                        font_size: style.bullet_font_size,
                        color: style.bullet_color.clone(),
                        bold: false,
                    },
                },
            ],
        });
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::Slide;

    #[test]
    fn test_title_section_first() {
        let doc = Document::new("Deck")
            .with_slide(Slide::new("One"))
            .with_slide(Slide::new("Two"));
        let sections = layout(&doc, &DeckStyle::default());

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].background, "1F4788");
        match &sections[0].blocks[0] {
            TextBlock::Heading { frame, text, align, style, .. } => {
                assert_eq!(text, "Deck");
                assert_eq!(*align, Align::Center);
                assert_eq!(frame.y, 2_057_400);
                assert_eq!(frame.cx, 8_229_600);
                assert_eq!(style.font_size, 44);
                assert!(style.bold);
            }
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[test]
    fn test_no_title_section_without_title() {
        let doc = Document::new("").with_slide(Slide::new("Only"));
        let sections = layout(&doc, &DeckStyle::default());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].background, "FFFFFF");
    }

    #[test]
    fn test_empty_slide_keeps_body_and_fallback_heading() {
        let doc = Document::new("").with_slide(Slide::default());
        let sections = layout(&doc, &DeckStyle::default());

        assert_eq!(sections[0].blocks.len(), 2);
        match &sections[0].blocks[0] {
            TextBlock::Heading { text, .. } => assert_eq!(text, FALLBACK_SLIDE_TITLE),
            other => panic!("unexpected block {:?}", other),
        }
        match &sections[0].blocks[1] {
            TextBlock::Bullets { points, frame, .. } => {
                assert!(points.is_empty());
                assert_eq!(frame.y, 1_371_600);
                assert_eq!(frame.cy, 3_657_600);
            }
            other => panic!("unexpected block {:?}", other),
        }
    }
}
