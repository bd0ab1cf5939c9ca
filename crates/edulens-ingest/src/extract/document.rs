//! PDF, Markdown and plain text documents.

use super::{extension_of, Extraction};
use crate::error::ExtractionError;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag};
use serde_json::json;
use std::path::Path;
use tracing::debug;

/// Extractor for document uploads.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl DocumentExtractor {
    pub const PDF_EXTENSIONS: &'static [&'static str] = &["pdf"];
    pub const MARKDOWN_EXTENSIONS: &'static [&'static str] = &["md", "markdown"];
    pub const TEXT_EXTENSIONS: &'static [&'static str] = &["txt", "text"];

    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, path: &Path) -> Result<Extraction, ExtractionError> {
        let ext = extension_of(path);
        if Self::PDF_EXTENSIONS.contains(&ext.as_str()) {
            extract_pdf(path)
        } else if Self::MARKDOWN_EXTENSIONS.contains(&ext.as_str()) {
            extract_markdown(path)
        } else if Self::TEXT_EXTENSIONS.contains(&ext.as_str()) {
            extract_plain(path)
        } else {
            Err(ExtractionError::Unsupported(format!(
                "document extension '{}'",
                ext
            )))
        }
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    std::fs::read(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn decode_utf8(path: &Path, bytes: Vec<u8>) -> Result<String, ExtractionError> {
    String::from_utf8(bytes).map_err(|e| ExtractionError::Decode {
        path: path.to_path_buf(),
        message: format!("not valid UTF-8: {}", e),
    })
}

fn extract_pdf(path: &Path) -> Result<Extraction, ExtractionError> {
    debug!("Extracting PDF: {:?}", path);

    let bytes = read_bytes(path)?;
    let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractionError::Decode {
        path: path.to_path_buf(),
        message: format!("failed to extract text from PDF: {}", e),
    })?;

    // pdf-extract separates pages with form feeds
    let pages = text.matches('\x0C').count().max(1);
    debug!("Extracted {} characters from {} PDF pages", text.len(), pages);

    Ok(Extraction::new(text)
        .with_metadata("format", json!("pdf"))
        .with_metadata("pages", json!(pages))
        .with_metadata("file_bytes", json!(bytes.len())))
}

fn extract_markdown(path: &Path) -> Result<Extraction, ExtractionError> {
    let bytes = read_bytes(path)?;
    let source = decode_utf8(path, bytes)?;
    let (text, title, links) = markdown_to_text(&source);

    let mut extraction = Extraction::new(text)
        .with_metadata("format", json!("markdown"))
        .with_metadata("links", json!(links));
    if let Some(title) = title {
        extraction = extraction.with_metadata("title", json!(title));
    }
    Ok(extraction)
}

fn extract_plain(path: &Path) -> Result<Extraction, ExtractionError> {
    let bytes = read_bytes(path)?;
    let len = bytes.len();
    let text = decode_utf8(path, bytes)?;

    Ok(Extraction::new(text)
        .with_metadata("format", json!("text"))
        .with_metadata("file_bytes", json!(len)))
}

/// Flatten Markdown into readable text.
///
/// Returns the text, the first H1 heading and every link target.
fn markdown_to_text(markdown: &str) -> (String, Option<String>, Vec<String>) {
    let mut text = String::new();
    let mut title: Option<String> = None;
    let mut links = Vec::new();
    let mut heading: Option<(HeadingLevel, String)> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading(level, _, _)) => {
                heading = Some((level, String::new()));
            }
            Event::End(Tag::Heading(_, _, _)) => {
                if let Some((level, content)) = heading.take() {
                    let content = content.trim().to_string();
                    if level == HeadingLevel::H1 && title.is_none() {
                        title = Some(content.clone());
                    }
                    text.push_str(&content);
                    text.push_str("\n\n");
                }
            }
            Event::End(Tag::CodeBlock(_)) | Event::End(Tag::Paragraph) => {
                text.push_str("\n\n");
            }
            Event::Start(Tag::Link(_, dest, _)) => {
                links.push(dest.to_string());
            }
            Event::Start(Tag::Item) => text.push_str("- "),
            Event::End(Tag::Item) | Event::End(Tag::List(_)) => text.push('\n'),
            Event::Text(t) | Event::Code(t) => match heading.as_mut() {
                Some((_, content)) => content.push_str(&t),
                None => text.push_str(&t),
            },
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            _ => {}
        }
    }

    (text.trim().to_string(), title, links)
}
