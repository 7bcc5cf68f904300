//! Word(.docx) 텍스트 추출 모듈
//!
//! docx는 zip 컨테이너이며 본문은 `word/document.xml`에 있습니다.
//! 문단(`<w:p>`)마다 한 줄로, 문단 안의 텍스트 런(`<w:t>`)을 이어 붙입니다.

use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{RagError, Result};

const DOCUMENT_XML: &str = "word/document.xml";

/// docx 파일에서 본문 텍스트 추출
pub fn extract_text_from_docx(path: &Path) -> Result<String> {
    let load_err = |reason: String| RagError::Load {
        path: path.to_path_buf(),
        reason,
    };

    let file = std::fs::File::open(path).map_err(|e| load_err(e.to_string()))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| load_err(format!("not a docx archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_XML)
        .map_err(|e| load_err(format!("{} missing: {}", DOCUMENT_XML, e)))?
        .read_to_string(&mut xml)
        .map_err(|e| load_err(e.to_string()))?;

    Ok(document_xml_to_text(&xml))
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab/>|<w:br/>|</w:p>")
            .expect("valid docx token regex")
    })
}

/// document.xml → 평문
fn document_xml_to_text(xml: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();

    for caps in token_regex().captures_iter(xml) {
        if let Some(run) = caps.get(1) {
            current.push_str(&unescape_xml(run.as_str()));
            continue;
        }
        match &caps[0] {
            "<w:tab/>" => current.push('\t'),
            "<w:br/>" => current.push('\n'),
            _ => paragraphs.push(std::mem::take(&mut current)),
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    paragraphs.join("\n")
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<w:document><w:body>
<w:p><w:r><w:t>Returns are accepted</w:t></w:r><w:r><w:t xml:space="preserve"> within 30 days.</w:t></w:r></w:p>
<w:p><w:r><w:t>退货政策</w:t><w:tab/><w:t>A &amp; B</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
</w:body></w:document>"#;

    #[test]
    fn test_document_xml_to_text() {
        let text = document_xml_to_text(SAMPLE);
        assert_eq!(
            text,
            "Returns are accepted within 30 days.\n退货政策\tA & B\ncell"
        );
    }

    #[test]
    fn test_extract_text_from_docx() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sample.docx");

        let file = std::fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file(DOCUMENT_XML, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(SAMPLE.as_bytes()).unwrap();
        zip.finish().unwrap();

        let text = extract_text_from_docx(&path).unwrap();
        assert!(text.starts_with("Returns are accepted within 30 days."));
    }

    #[test]
    fn test_extract_text_from_non_zip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, "not a zip").unwrap();

        let result = extract_text_from_docx(&path);
        assert!(matches!(result, Err(RagError::Load { .. })));
    }
}
