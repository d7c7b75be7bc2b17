//! PPTX file writer.

use crate::layout::{layout, Align, DeckStyle, Frame, RunStyle, Section, TextBlock};
use crate::parts::{self, xml_text, Rel};
use base64::Engine;
use deck_core::{extract_document, validate, Document, Error, Result};
use serde_json::Value;
use std::fmt::Write as FmtWrite;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// MIME type of the rendered file.
pub const PPTX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Default file name offered for download.
pub const DEFAULT_FILENAME: &str = "presentation.pptx";

/// Writer for PPTX (Office Open XML) files.
#[derive(Debug, Clone, Default)]
pub struct DeckWriter {
    style: DeckStyle,
}

impl DeckWriter {
    /// Create a writer with the default style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom style.
    pub fn with_style(mut self, style: DeckStyle) -> Self {
        self.style = style;
        self
    }

    /// The sections `document` renders to, in output order.
    pub fn sections(&self, document: &Document) -> Vec<Section> {
        layout(document, &self.style)
    }

    /// Render a document to PPTX bytes.
    ///
    /// Output depends only on the document and style: entry order, entry
    /// timestamps and ids are fixed, so equal inputs give identical bytes.
    pub fn render(&self, document: &Document) -> Result<Vec<u8>> {
        let sections = self.sections(document);
        log::debug!(
            "Rendering \"{}\" as {} sections",
            document.title,
            sections.len()
        );

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let count = sections.len();

        add_part(&mut zip, "[Content_Types].xml", &parts::content_types_xml(count))?;
        add_part(
            &mut zip,
            "_rels/.rels",
            &parts::relationships_xml(&[
                Rel::new("rId1", parts::REL_OFFICE_DOCUMENT, "ppt/presentation.xml"),
                Rel::new("rId2", parts::REL_CORE_PROPERTIES, "docProps/core.xml"),
                Rel::new("rId3", parts::REL_EXTENDED_PROPERTIES, "docProps/app.xml"),
            ]),
        )?;
        add_part(&mut zip, "docProps/app.xml", &parts::app_xml(count))?;
        add_part(&mut zip, "docProps/core.xml", &parts::core_xml(&document.title))?;

        add_part(
            &mut zip,
            "ppt/presentation.xml",
            &parts::presentation_xml(count, self.style.slide_width, self.style.slide_height),
        )?;
        add_part(
            &mut zip,
            "ppt/_rels/presentation.xml.rels",
            &parts::relationships_xml(&presentation_rels(count)),
        )?;

        add_part(&mut zip, "ppt/slideMasters/slideMaster1.xml", &parts::slide_master_xml())?;
        add_part(
            &mut zip,
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            &parts::relationships_xml(&[
                Rel::office("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                Rel::office("rId2", "theme", "../theme/theme1.xml"),
            ]),
        )?;
        add_part(&mut zip, "ppt/slideLayouts/slideLayout1.xml", &parts::slide_layout_xml())?;
        add_part(
            &mut zip,
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            &parts::relationships_xml(&[Rel::office(
                "rId1",
                "slideMaster",
                "../slideMasters/slideMaster1.xml",
            )]),
        )?;
        add_part(&mut zip, "ppt/theme/theme1.xml", &parts::theme_xml())?;

        let slide_rels = parts::relationships_xml(&[Rel::office(
            "rId1",
            "slideLayout",
            "../slideLayouts/slideLayout1.xml",
        )]);
        for (idx, section) in sections.iter().enumerate() {
            let number = idx + 1;
            add_part(
                &mut zip,
                &format!("ppt/slides/slide{}.xml", number),
                &section_xml(section),
            )?;
            add_part(
                &mut zip,
                &format!("ppt/slides/_rels/slide{}.xml.rels", number),
                &slide_rels,
            )?;
        }

        let cursor = zip
            .finish()
            .map_err(|e| Error::RenderFailure(format!("Failed to finish ZIP: {}", e)))?;
        Ok(cursor.into_inner())
    }

    /// Validate an untrusted JSON value, then render it.
    pub fn render_value(&self, value: &Value) -> Result<Vec<u8>> {
        let document = validate(value)?;
        self.render(&document)
    }

    /// Locate a document inside a text blob, then render it.
    pub fn render_text(&self, text: &str) -> Result<Vec<u8>> {
        let document = extract_document(text)?;
        self.render(&document)
    }

    /// Render and encode with standard base64 for transport.
    pub fn render_base64(&self, document: &Document) -> Result<String> {
        let bytes = self.render(document)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

fn presentation_rels(slide_count: usize) -> Vec<Rel> {
    let mut rels = Vec::with_capacity(slide_count + 2);
    rels.push(Rel::office(
        "rId1",
        "slideMaster",
        "slideMasters/slideMaster1.xml",
    ));
    for number in 1..=slide_count {
        rels.push(Rel::office(
            format!("rId{}", number + 1),
            "slide",
            format!("slides/slide{}.xml", number),
        ));
    }
    rels.push(Rel::office(
        format!("rId{}", slide_count + 2),
        "theme",
        "theme/theme1.xml",
    ));
    rels
}

/// Write one part with a fixed timestamp.
fn add_part(zip: &mut ZipWriter<Cursor<Vec<u8>>>, path: &str, content: &str) -> Result<()> {
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    zip.start_file(path, options)
        .map_err(|e| Error::RenderFailure(format!("Failed to start '{}': {}", path, e)))?;
    zip.write_all(content.as_bytes())
        .map_err(|e| Error::RenderFailure(format!("Failed to write '{}': {}", path, e)))?;
    Ok(())
}

/// Slide XML for one section.
fn section_xml(section: &Section) -> String {
    let mut xml = String::with_capacity(2048);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    let _ = write!(
        xml,
        r#"<p:sld xmlns:a="{}" xmlns:r="{}" xmlns:p="{}">"#,
        parts::NS_A,
        parts::NS_R,
        parts::NS_P
    );
    xml.push_str("<p:cSld>");
    let _ = write!(
        xml,
        r#"<p:bg><p:bgPr><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg>"#,
        section.background
    );
    xml.push_str("<p:spTree>");
    xml.push_str(parts::GROUP_SHAPE_HEADER);

    // Id 1 is the group shape; text blocks start at 2.
    for (idx, block) in section.blocks.iter().enumerate() {
        write_block(&mut xml, idx as u32 + 2, block);
    }

    xml.push_str("</p:spTree></p:cSld>");
    xml.push_str("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>");
    xml.push_str("</p:sld>");
    xml
}

fn write_block(xml: &mut String, id: u32, block: &TextBlock) {
    match block {
        TextBlock::Heading {
            name,
            frame,
            text,
            align,
            style,
        } => {
            let anchor = match align {
                Align::Center => "ctr",
                Align::Left => "t",
            };
            open_shape(xml, id, name, frame, anchor);
            xml.push_str("<a:p>");
            if *align == Align::Center {
                xml.push_str(r#"<a:pPr algn="ctr"/>"#);
            }
            write_run(xml, text, style);
            xml.push_str("</a:p>");
            close_shape(xml);
        }
        TextBlock::Bullets {
            name,
            frame,
            points,
            style,
        } => {
            open_shape(xml, id, name, frame, "t");
            if points.is_empty() {
                // A text body needs at least one paragraph; this one has no bullet.
                let _ = write!(
                    xml,
                    r#"<a:p><a:endParaRPr lang="en-US" sz="{}" dirty="0"/></a:p>"#,
                    style.font_size * 100
                );
            }
            for point in points {
                xml.push_str(r#"<a:p><a:pPr marL="342900" indent="-342900"><a:buFont typeface="Arial"/><a:buChar char="&#8226;"/></a:pPr>"#);
                write_run(xml, point, style);
                xml.push_str("</a:p>");
            }
            close_shape(xml);
        }
    }
}

fn open_shape(xml: &mut String, id: u32, name: &str, frame: &Frame, anchor: &str) {
    let _ = write!(
        xml,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name} {n}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#,
        id = id,
        name = name,
        n = id - 1
    );
    let _ = write!(
        xml,
        r#"<p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>"#,
        frame.x, frame.y, frame.cx, frame.cy
    );
    let _ = write!(
        xml,
        r#"<p:txBody><a:bodyPr wrap="square" rtlCol="0" anchor="{}"><a:normAutofit/></a:bodyPr><a:lstStyle/>"#,
        anchor
    );
}

fn close_shape(xml: &mut String) {
    xml.push_str("</p:txBody></p:sp>");
}

fn write_run(xml: &mut String, text: &str, style: &RunStyle) {
    let _ = write!(
        xml,
        r#"<a:r><a:rPr lang="en-US" sz="{}" b="{}" dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:rPr><a:t>{}</a:t></a:r>"#,
        style.font_size * 100,
        if style.bold { 1 } else { 0 },
        style.color,
        xml_text(text)
    );
}
