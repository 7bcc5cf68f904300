//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트를 사용하여 PDF에서 페이지별 텍스트를 추출합니다.

use std::path::Path;

use crate::error::{RagError, Result};

/// PDF에서 페이지별 텍스트 추출
///
/// (페이지 번호, 텍스트) 목록을 반환합니다. 페이지 번호는 1부터 시작합니다.
/// 빈 페이지도 번호를 유지하기 위해 결과에 포함됩니다.
pub fn extract_text_from_pdf(path: &Path) -> Result<Vec<(u32, String)>> {
    let bytes = std::fs::read(path).map_err(|e| RagError::Load {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| {
        RagError::Load {
            path: path.to_path_buf(),
            reason: format!("PDF extraction failed: {}", e),
        }
    })?;

    if pages.iter().all(|p| p.trim().is_empty()) {
        tracing::warn!(
            "No text extracted from PDF: {:?}. It might be a scanned document.",
            path
        );
    }

    Ok((1..).zip(pages).collect())
}

/// 테스트용 최소 PDF (페이지마다 Helvetica 텍스트 한 줄)
#[cfg(test)]
pub(crate) fn sample_pdf(pages: &[&str]) -> Vec<u8> {
    let font_id = 3;
    let mut objects: Vec<String> = Vec::new();

    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        pages.len()
    ));
    objects.push(
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    );

    for (i, text) in pages.iter().enumerate() {
        let content_id = 5 + 2 * i;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 {} 0 R >> >> /Contents {} 0 R >>",
            font_id, content_id
        ));
        let stream = format!("BT /F1 24 Tf 72 700 Td ({}) Tj ET", text);
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_at = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{:010} 00000 n \n", offset));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    ));
    out.extend_from_slice(xref.as_bytes());
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn page_of(pages: &[(u32, String)], needle: &str) -> Option<u32> {
        pages
            .iter()
            .find(|(_, text)| text.contains(needle))
            .map(|(page, _)| *page)
    }

    #[test]
    fn test_extract_pages_are_numbered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manual.pdf");
        std::fs::write(&path, sample_pdf(&["FirstPageText", "SecondPageText"])).unwrap();

        let pages = extract_text_from_pdf(&path).unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(page_of(&pages, "FirstPageText"), Some(1));
        assert_eq!(page_of(&pages, "SecondPageText"), Some(2));
        assert!(!pages[0].1.contains("SecondPageText"));
    }

    #[test]
    fn test_extract_missing_pdf() {
        let result = extract_text_from_pdf(Path::new("/definitely/not/here.pdf"));
        assert!(matches!(result, Err(RagError::Load { .. })));
    }

    #[test]
    fn test_extract_not_a_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, "plain text pretending").unwrap();

        assert!(matches!(
            extract_text_from_pdf(&path),
            Err(RagError::Load { .. })
        ));
    }
}
