//! 콘텐츠 추출 모듈
//!
//! 수집된 파일에서 텍스트를 추출하여 `Document`로 만듭니다.
//! - 텍스트 파일: 직접 읽기 (UTF-8, 잘못된 바이트는 대체 문자)
//! - PDF 파일: pdf-extract로 페이지별 추출 (`pdf` 기능)
//! - Word 파일: document.xml 문단 추출 (`docx` 기능)

#[cfg(feature = "docx")]
pub mod docx;
#[cfg(feature = "pdf")]
pub mod pdf;

use std::path::{Path, PathBuf};

use crate::collector::{CollectedFile, Collection, FileType, SkippedFile};
use crate::error::{RagError, Result};

// ============================================================================
// Document
// ============================================================================

/// 페이지 단위 텍스트
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// PDF 페이지 번호 (1부터 시작), 텍스트/Word는 None
    pub page: Option<u32>,
    pub text: String,
}

/// 로드된 문서
#[derive(Debug, Clone)]
pub struct Document {
    /// 문서 식별자 (파일 경로)
    pub path: PathBuf,
    pub file_name: String,
    pub file_type: FileType,
    pub pages: Vec<PageText>,
}

impl Document {
    /// 전체 글자 수
    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }
}

/// 로드 결과
#[derive(Debug, Default)]
pub struct LoadedDocuments {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedFile>,
}

// ============================================================================
// Content Extractor
// ============================================================================

/// 콘텐츠 추출기
#[derive(Debug, Default)]
pub struct ContentExtractor;

impl ContentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 수집된 파일 전체 로드
    ///
    /// 읽기에 실패한 파일은 경고를 남기고 건너뜁니다.
    pub async fn load_all(&self, collection: Collection) -> LoadedDocuments {
        let mut loaded = LoadedDocuments {
            documents: Vec::with_capacity(collection.files.len()),
            skipped: collection.skipped,
        };

        for file in &collection.files {
            match self.load(file).await {
                Ok(doc) => {
                    tracing::debug!(
                        "Loaded {} ({} pages, {} chars)",
                        doc.file_name,
                        doc.pages.len(),
                        doc.char_count()
                    );
                    loaded.documents.push(doc);
                }
                Err(e) => {
                    tracing::warn!("Skipping file: {}", e);
                    loaded.skipped.push(SkippedFile::from_error(&e));
                }
            }
        }

        loaded
    }

    /// 파일 하나를 문서로 로드
    pub async fn load(&self, file: &CollectedFile) -> Result<Document> {
        let pages = match file.file_type {
            FileType::Text => self.extract_text(&file.path).await?,
            FileType::Pdf => self.extract_pdf(&file.path).await?,
            FileType::Docx => self.extract_docx(&file.path).await?,
        };

        Ok(Document {
            path: file.path.clone(),
            file_name: file.file_name.clone(),
            file_type: file.file_type,
            pages,
        })
    }

    /// 텍스트 파일에서 추출
    async fn extract_text(&self, path: &Path) -> Result<Vec<PageText>> {
        let bytes = tokio::fs::read(path).await.map_err(|e| RagError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(vec![PageText {
            page: None,
            text: String::from_utf8_lossy(&bytes).into_owned(),
        }])
    }

    /// PDF 파일에서 추출
    #[cfg(feature = "pdf")]
    async fn extract_pdf(&self, path: &Path) -> Result<Vec<PageText>> {
        // PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
        let owned = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || pdf::extract_text_from_pdf(&owned))
            .await
            .map_err(|e| RagError::Load {
                path: path.to_path_buf(),
                reason: format!("PDF extraction task failed: {}", e),
            })??;

        Ok(pages
            .into_iter()
            .map(|(page, text)| PageText {
                page: Some(page),
                text,
            })
            .collect())
    }

    #[cfg(not(feature = "pdf"))]
    async fn extract_pdf(&self, path: &Path) -> Result<Vec<PageText>> {
        Err(disabled(path, "pdf"))
    }

    /// Word 파일에서 추출
    #[cfg(feature = "docx")]
    async fn extract_docx(&self, path: &Path) -> Result<Vec<PageText>> {
        let owned = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || docx::extract_text_from_docx(&owned))
            .await
            .map_err(|e| RagError::Load {
                path: path.to_path_buf(),
                reason: format!("docx extraction task failed: {}", e),
            })??;

        Ok(vec![PageText { page: None, text }])
    }

    #[cfg(not(feature = "docx"))]
    async fn extract_docx(&self, path: &Path) -> Result<Vec<PageText>> {
        Err(disabled(path, "docx"))
    }
}

#[cfg(any(not(feature = "pdf"), not(feature = "docx")))]
fn disabled(path: &Path, feature: &str) -> RagError {
    RagError::Load {
        path: path.to_path_buf(),
        reason: format!("{} support is not enabled in this build", feature),
    }
}

// ============================================================================
// Tests
// ============================================================================
