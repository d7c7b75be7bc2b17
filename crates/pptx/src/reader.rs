//! PPTX reader used to inspect rendered decks.

use deck_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Read, Seek};
use zip::ZipArchive;

/// A paragraph of a shape's text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedParagraph {
    pub text: String,
    /// Whether the paragraph carries a bullet character.
    pub bullet: bool,
}

/// A shape with its position and non-empty paragraphs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedShape {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub paragraphs: Vec<RenderedParagraph>,
}

/// One slide of a PPTX file, in presentation order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSection {
    /// 1-based slide number.
    pub number: usize,
    /// Solid background colour, if the slide sets one.
    pub background: Option<String>,
    /// Shapes in reading order (top-to-bottom, then left-to-right).
    pub shapes: Vec<RenderedShape>,
}

impl RenderedSection {
    /// All paragraph texts, in reading order.
    pub fn texts(&self) -> Vec<&str> {
        self.shapes
            .iter()
            .flat_map(|s| s.paragraphs.iter().map(|p| p.text.as_str()))
            .collect()
    }

    /// Number of bulleted paragraphs on the slide.
    pub fn bullet_count(&self) -> usize {
        self.shapes
            .iter()
            .flat_map(|s| s.paragraphs.iter())
            .filter(|p| p.bullet)
            .count()
    }
}

/// Reader for PPTX (Office Open XML) files.
pub struct DeckReader;

impl DeckReader {
    /// Create a new PPTX reader.
    pub fn new() -> Self {
        Self
    }

    /// Read every slide of a PPTX file.
    pub fn read<R: Read + Seek>(&self, reader: R) -> Result<Vec<RenderedSection>> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let slide_order = self.get_slide_order(&mut archive)?;
        log::debug!("Found {} slides", slide_order.len());

        slide_order
            .iter()
            .enumerate()
            .map(|(idx, path)| self.read_slide(&mut archive, path, idx + 1))
            .collect()
    }

    /// Get the ordered list of slide paths from the presentation relationships.
    fn get_slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels_content = self.read_file_from_archive(archive, "ppt/_rels/presentation.xml.rels")?;
        let mut slides: Vec<(String, Option<usize>)> = Vec::new();

        let mut reader = Reader::from_str(&rels_content);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let rel_type = attr_value(e, b"Type").unwrap_or_default();
                    let target = attr_value(e, b"Target").unwrap_or_default();
                    let id = attr_value(e, b"Id").unwrap_or_default();

                    if rel_type.ends_with("/slide") {
                        let order_num =
                            extract_slide_number(&id).or_else(|| extract_slide_number(&target));
                        let full_path = match target.strip_prefix('/') {
                            Some(absolute) => absolute.to_string(),
                            None => format!("ppt/{}", target),
                        };
                        slides.push((full_path, order_num));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing relationships: {}",
                        e
                    )));
                }
                _ => {}
            }
        }

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Read a single slide from the archive.
    fn read_slide<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
        number: usize,
    ) -> Result<RenderedSection> {
        let content = self.read_file_from_archive(archive, slide_path)?;
        let (background, mut shapes) = parse_slide_xml(&content)?;

        shapes.sort_by(|a, b| {
            a.y.partial_cmp(&b.y)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
        });

        Ok(RenderedSection {
            number,
            background,
            shapes,
        })
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }
}

impl Default for DeckReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the background colour and shapes from slide XML.
fn parse_slide_xml(xml: &str) -> Result<(Option<String>, Vec<RenderedShape>)> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut background = None;
    let mut shapes = Vec::new();
    let mut in_background = false;
    let mut current_shape: Option<RenderedShape> = None;
    let mut current_paragraph: Option<RenderedParagraph> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"bg" => in_background = true,
                b"sp" => current_shape = Some(RenderedShape::default()),
                b"p" if current_shape.is_some() => {
                    current_paragraph = Some(RenderedParagraph {
                        text: String::new(),
                        bullet: false,
                    });
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"srgbClr" if in_background && background.is_none() => {
                    background = attr_value(e, b"val");
                }
                b"cNvPr" => {
                    if let (Some(shape), Some(name)) = (current_shape.as_mut(), attr_value(e, b"name")) {
                        shape.name = name;
                    }
                }
                b"off" => {
                    if let Some(shape) = current_shape.as_mut() {
                        if let Some(x) = attr_value(e, b"x").and_then(|v| v.parse().ok()) {
                            shape.x = x;
                        }
                        if let Some(y) = attr_value(e, b"y").and_then(|v| v.parse().ok()) {
                            shape.y = y;
                        }
                    }
                }
                b"buChar" => {
                    if let Some(paragraph) = current_paragraph.as_mut() {
                        paragraph.bullet = true;
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if let Some(paragraph) = current_paragraph.as_mut() {
                    let text = e
                        .unescape()
                        .map_err(|e| Error::XmlError(format!("Bad text in slide: {}", e)))?;
                    paragraph.text.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"bg" => in_background = false,
                b"p" => {
                    if let (Some(shape), Some(paragraph)) =
                        (current_shape.as_mut(), current_paragraph.take())
                    {
                        if !paragraph.text.is_empty() {
                            shape.paragraphs.push(paragraph);
                        }
                    }
                }
                b"sp" => {
                    if let Some(shape) = current_shape.take() {
                        shapes.push(shape);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing slide: {}", e)));
            }
            _ => {}
        }
    }

    Ok((background, shapes))
}

/// Value of an attribute, lossily decoded.
fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
