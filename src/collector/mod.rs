//! 파일 수집 모듈
//!
//! 문서 폴더를 평면(비재귀) 스캔하여 지원하는 확장자(.txt, .pdf, .docx)만 수집합니다.
//! 지원하지 않는 파일은 건너뛰고 경고로 기록합니다.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{RagError, Result};

// ============================================================================
// File Types
// ============================================================================

/// 지원하는 파일 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// 일반 텍스트
    #[serde(rename = "txt")]
    Text,
    /// PDF 파일
    Pdf,
    /// Word 파일
    Docx,
}

impl FileType {
    /// 확장자로 파일 타입 결정
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" => Some(FileType::Text),
            "pdf" => Some(FileType::Pdf),
            "docx" => Some(FileType::Docx),
            _ => None,
        }
    }

    /// 파일 경로에서 타입 결정
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// 인용에 표시되는 타입 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Text => "txt",
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Collected File
// ============================================================================

/// 수집된 파일 정보
#[derive(Debug, Clone)]
pub struct CollectedFile {
    /// 파일 경로
    pub path: PathBuf,
    /// 파일 이름
    pub file_name: String,
    /// 파일 타입
    pub file_type: FileType,
    /// 파일 크기 (바이트)
    pub size: u64,
    /// 수정 시간
    pub modified_at: Option<SystemTime>,
}

impl CollectedFile {
    /// 파일에서 CollectedFile 생성
    ///
    /// 지원하지 않는 확장자면 `Load` 에러를 반환합니다.
    pub fn from_path(path: PathBuf) -> Result<Self> {
        let file_type = FileType::from_path(&path).ok_or_else(|| RagError::Load {
            path: path.clone(),
            reason: "unsupported file type".to_string(),
        })?;

        let metadata = std::fs::metadata(&path).map_err(|e| RagError::Load {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path,
            file_name,
            file_type,
            size: metadata.len(),
            modified_at: metadata.modified().ok(),
        })
    }
}

/// 건너뛴 파일
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

impl SkippedFile {
    pub(crate) fn from_error(err: &RagError) -> Self {
        match err {
            RagError::Load { path, reason } => Self {
                file: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
                reason: reason.clone(),
            },
            other => Self {
                file: String::new(),
                reason: other.to_string(),
            },
        }
    }
}

// ============================================================================
// File Collector
// ============================================================================

/// 폴더 스캔 결과
#[derive(Debug, Default)]
pub struct Collection {
    pub files: Vec<CollectedFile>,
    pub skipped: Vec<SkippedFile>,
}

/// 파일 수집기
#[derive(Debug, Default)]
pub struct FileCollector;

impl FileCollector {
    pub fn new() -> Self {
        Self
    }

    /// 폴더 평면 스캔 (파일 이름 순)
    ///
    /// 하위 폴더는 따라가지 않습니다. 빈 폴더는 빈 결과를 반환합니다.
    pub fn collect_directory(&self, dir: &Path) -> Result<Collection> {
        if !dir.is_dir() {
            return Err(RagError::FolderNotFound(dir.to_path_buf()));
        }

        let mut collection = Collection::default();

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read entry: {}", e);
                    collection.skipped.push(SkippedFile {
                        file: e
                            .path()
                            .map(|p| p.display().to_string())
                            .unwrap_or_default(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            match CollectedFile::from_path(entry.into_path()) {
                Ok(file) => collection.files.push(file),
                Err(e) => {
                    tracing::warn!("Skipping file: {}", e);
                    collection.skipped.push(SkippedFile::from_error(&e));
                }
            }
        }

        tracing::info!(
            "Collected {} files from {:?} ({} skipped)",
            collection.files.len(),
            dir,
            collection.skipped.len()
        );
        Ok(collection)
    }
}

// ============================================================================
// Docs Listing
// ============================================================================

/// UI 사이드바용 문서 상태
#[derive(Debug, Clone, Serialize)]
pub struct DocStatus {
    pub file: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub size_kb: f64,
    pub modified: Option<String>,
}

/// 문서 폴더 목록
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocsListing {
    pub folder: String,
    pub exists: bool,
    pub docs: Vec<DocStatus>,
    /// 가장 최근 수정 시간
    pub newest: Option<String>,
}

/// 문서 폴더의 지원 파일 목록 조회
///
/// 폴더가 없으면 `exists: false`인 빈 목록을 반환합니다.
pub fn list_docs(dir: &Path) -> DocsListing {
    let mut listing = DocsListing {
        folder: dir.display().to_string(),
        ..Default::default()
    };

    let Ok(collection) = FileCollector::new().collect_directory(dir) else {
        return listing;
    };
    listing.exists = true;

    let mut newest: Option<SystemTime> = None;
    for file in collection.files {
        if let Some(mtime) = file.modified_at {
            newest = Some(newest.map_or(mtime, |n| n.max(mtime)));
        }
        listing.docs.push(DocStatus {
            file: file.file_name,
            file_type: file.file_type,
            size_kb: size_kb(file.size),
            modified: file.modified_at.map(format_time),
        });
    }
    listing.newest = newest.map(format_time);
    listing
}

/// 바이트 → KiB (소수점 한 자리)
fn size_kb(bytes: u64) -> f64 {
    (bytes as f64 / 1024.0 * 10.0).round() / 10.0
}

/// 로컬 시간 포맷팅
pub(crate) fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================
