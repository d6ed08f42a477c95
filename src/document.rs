//! Document loading for local keyword retrieval.
//!
//! Plain text formats are read directly (invalid UTF-8 is replaced, not
//! rejected). PDF and DOCX files are converted to text first; DOCX
//! paragraphs become separate lines so line-window search stays meaningful.

use std::io::{self, Read};
use std::path::Path;

use thiserror::Error;

use store_harness_core::error::{HarnessError, Result};

/// Maximum decompressed bytes to read from `word/document.xml` (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

impl From<ExtractError> for HarnessError {
    fn from(e: ExtractError) -> Self {
        HarnessError::Io(io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Read a document and return its lines in order.
///
/// # Errors
///
/// [`HarnessError::NotFound`] when `path` is not an existing file.
pub fn load_lines(path: &Path) -> Result<Vec<String>> {
    let text = load_text(path)?;
    Ok(text.lines().map(str::to_string).collect())
}

/// Read a document as text, extracting PDF and DOCX content.
pub fn load_text(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(HarnessError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let text = match extension.as_str() {
        "pdf" => extract_pdf(&bytes)?,
        "docx" => extract_docx(&bytes)?,
        _ => String::from_utf8_lossy(&bytes).into_owned(),
    };
    tracing::debug!(path = %path.display(), chars = text.len(), "loaded document");
    Ok(text)
}

fn extract_pdf(bytes: &[u8]) -> std::result::Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn extract_docx(bytes: &[u8]) -> std::result::Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }
    paragraphs_from_document_xml(&xml)
}

/// Collect `w:t` runs, one output line per `w:p` paragraph.
fn paragraphs_from_document_xml(xml: &[u8]) -> std::result::Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Docx(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn missing_document_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = load_lines(&tmp.path().join("HmEG.md")).unwrap_err();
        assert!(matches!(err, HarnessError::NotFound(_)));
    }

    #[test]
    fn markdown_is_split_into_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("guide.md");
        std::fs::write(&path, "# Title\n\nCreate a viewer.\r\nDone\n").unwrap();
        let lines = load_lines(&path).unwrap();
        assert_eq!(lines, vec!["# Title", "", "Create a viewer.", "Done"]);
    }

    #[test]
    fn invalid_pdf_is_an_io_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        assert!(matches!(load_lines(&path), Err(HarnessError::Io(_))));
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.docx");
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(
            br#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>
<w:p><w:r><w:t>First </w:t></w:r><w:r><w:t>paragraph</w:t></w:r></w:p>
<w:p><w:r><w:t>Second &amp; last</w:t></w:r></w:p>
</w:body>
</w:document>"#,
        )
        .unwrap();
        zip.finish().unwrap();

        let lines = load_lines(&path).unwrap();
        let non_empty: Vec<_> = lines.iter().filter(|l| !l.trim().is_empty()).collect();
        assert_eq!(non_empty, vec!["First paragraph", "Second & last"]);
    }
}
