//! DOCX text extraction.
//!
//! A DOCX file is a zip archive; the body lives in `word/document.xml`.
//! Paragraph texts are joined with newlines in document order.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use super::TextExtractor;
use crate::error::DocumentError;

const DOCUMENT_PART: &str = "word/document.xml";

/// DOCX paragraph text extractor.
#[derive(Debug, Clone, Default)]
pub struct DocxTextExtractor;

impl DocxTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for DocxTextExtractor {
    fn extract_text(&self, data: &[u8]) -> Result<String, DocumentError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))
            .map_err(|e| DocumentError::Docx(format!("not a zip archive: {}", e)))?;

        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| DocumentError::Docx(format!("missing {}: {}", DOCUMENT_PART, e)))?
            .read_to_string(&mut xml)?;

        let paragraphs = paragraphs_from_xml(&xml)?;
        debug!("Extracted {} paragraphs from DOCX", paragraphs.len());

        Ok(paragraphs.join("\n"))
    }
}

/// Collect the text of every `w:p` element in document order.
fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>, DocumentError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => current.clear(),
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(std::mem::take(&mut current)),
                b"w:t" => in_text = false,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                b"w:tab" => current.push('\t'),
                b"w:br" | b"w:cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|e| DocumentError::Docx(format!("bad text run: {}", e)))?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DocumentError::Docx(format!(
                    "malformed XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use pretty_assertions::assert_eq;

    fn build_docx(document_xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(DOCUMENT_PART, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_paragraphs_joined_with_newlines() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Payment terms</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">amount: </w:t></w:r><w:r><w:t>$500</w:t></w:r></w:p>
    <w:p/>
    <w:p><w:r><w:t>Tom &amp; Jerry</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

        let text = DocxTextExtractor::new().extract_text(&build_docx(xml)).unwrap();
        assert_eq!(text, "Payment terms\namount: $500\n\nTom & Jerry");
    }

    #[test]
    fn test_tabs_and_breaks() {
        let xml = r#"<w:document xmlns:w="x"><w:body>
<w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r></w:p>
</w:body></w:document>"#;

        let text = DocxTextExtractor::new().extract_text(&build_docx(xml)).unwrap();
        assert_eq!(text, "a\tb\nc");
    }

    #[test]
    fn test_not_a_zip() {
        let result = DocxTextExtractor::new().extract_text(b"plain text, not a docx");
        assert!(matches!(result, Err(DocumentError::Docx(_))));
    }

    #[test]
    fn test_missing_document_part() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/styles.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<w:styles/>").unwrap();
        let data = writer.finish().unwrap().into_inner();

        let result = DocxTextExtractor::new().extract_text(&data);
        assert!(matches!(result, Err(DocumentError::Docx(_))));
    }
}
