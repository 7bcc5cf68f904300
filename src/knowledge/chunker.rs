//! Text Chunking Module
//!
//! 고정 길이(문자 수) 청크 분할을 제공합니다.
//! 청크는 원문을 그대로 잘라낸 조각이므로 인용 위치를 그대로 추적할 수 있습니다.

use serde::{Deserialize, Serialize};

use crate::collector::FileType;
use crate::error::{RagError, Result};
use crate::extractor::Document;

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 기본 청크 크기 (문자 수)
pub const DEFAULT_CHUNK_SIZE: usize = 700;
/// 기본 오버랩 크기 (문자 수)
pub const DEFAULT_CHUNK_OVERLAP: usize = 120;

/// 청킹 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// 최대 청크 크기 (문자 수)
    pub chunk_size: usize,
    /// 연속 청크 간 오버랩 (문자 수)
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// 설정 검증
    ///
    /// 오버랩은 청크 크기보다 작아야 합니다.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Configuration(
                "chunk size must be greater than 0".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk overlap ({}) must be less than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Chunk
// ============================================================================

/// 인덱싱 단위 청크
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    /// `{파일}|p{페이지}|c{인덱스}`
    pub id: String,
    /// 원본 문서 경로 (조회용 참조)
    pub source: String,
    pub file_name: String,
    pub file_type: FileType,
    pub page: Option<u32>,
    /// 문서 내 순번 (0부터, 페이지를 넘어 이어짐)
    pub chunk_index: u32,
    pub text: String,
}

impl Chunk {
    pub fn make_id(file_name: &str, page: Option<u32>, chunk_index: u32) -> String {
        format!("{}|p{}|c{}", file_name, page.unwrap_or(0), chunk_index)
    }
}

/// 텍스트 내 청크 구간
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan<'a> {
    /// 텍스트 내 순번
    pub index: usize,
    pub text: &'a str,
}

// ============================================================================
// TextChunker
// ============================================================================

/// 고정 길이 청커
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    config: ChunkConfig,
}

impl TextChunker {
    /// 설정으로 생성 (검증 실패 시 `Configuration` 에러)
    pub fn new(config: ChunkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkConfig {
        self.config
    }

    /// 텍스트를 청크 구간으로 분할 (지연 평가)
    ///
    /// 앞뒤 공백은 잘라내고, 공백뿐인 텍스트는 청크를 만들지 않습니다.
    pub fn chunks<'a>(&self, text: &'a str) -> ChunkSpans<'a> {
        ChunkSpans {
            text: text.trim(),
            start: 0,
            index: 0,
            size: self.config.chunk_size,
            overlap: self.config.chunk_overlap,
            done: false,
        }
    }

    /// 문서를 청크로 분할 (지연 평가)
    ///
    /// 페이지 경계를 넘는 청크는 만들지 않고, 청크 순번은 문서 전체에서 이어집니다.
    pub fn chunk_document<'a>(&'a self, doc: &'a Document) -> impl Iterator<Item = Chunk> + 'a {
        let source = doc.path.display().to_string();

        doc.pages
            .iter()
            .flat_map(move |page| self.chunks(&page.text).map(move |span| (page.page, span)))
            .zip(0u32..)
            .map(move |((page, span), chunk_index)| Chunk {
                id: Chunk::make_id(&doc.file_name, page, chunk_index),
                source: source.clone(),
                file_name: doc.file_name.clone(),
                file_type: doc.file_type,
                page,
                chunk_index,
                text: span.text.to_string(),
            })
    }
}

/// 청크 구간 이터레이터
#[derive(Debug, Clone)]
pub struct ChunkSpans<'a> {
    text: &'a str,
    /// 현재 시작 바이트 위치
    start: usize,
    index: usize,
    size: usize,
    overlap: usize,
    done: bool,
}

impl<'a> Iterator for ChunkSpans<'a> {
    type Item = ChunkSpan<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.start >= self.text.len() {
            self.done = true;
            return None;
        }

        let rest = &self.text[self.start..];
        let end_offset = rest
            .char_indices()
            .nth(self.size)
            .map_or(rest.len(), |(offset, _)| offset);
        let end = self.start + end_offset;

        let span = ChunkSpan {
            index: self.index,
            text: &self.text[self.start..end],
        };
        self.index += 1;

        if end == self.text.len() {
            self.done = true;
        } else {
            // 끝에서 overlap 문자만큼 되돌아가 다음 청크 시작
            let next_start = if self.overlap == 0 {
                end
            } else {
                span.text
                    .char_indices()
                    .rev()
                    .nth(self.overlap - 1)
                    .map(|(offset, _)| self.start + offset)
                    .unwrap_or(self.start)
            };
            self.start = next_start;
        }

        Some(span)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::PageText;
    use std::path::PathBuf;

    fn chunker(size: usize, overlap: usize) -> TextChunker {
        TextChunker::new(ChunkConfig::new(size, overlap)).unwrap()
    }

    fn texts(chunker: &TextChunker, text: &str) -> Vec<String> {
        chunker.chunks(text).map(|s| s.text.to_string()).collect()
    }

    #[test]
    fn test_config_validation() {
        assert!(ChunkConfig::default().validate().is_ok());
        assert!(matches!(
            TextChunker::new(ChunkConfig::new(10, 10)),
            Err(RagError::Configuration(_))
        ));
        assert!(matches!(
            TextChunker::new(ChunkConfig::new(10, 11)),
            Err(RagError::Configuration(_))
        ));
        assert!(matches!(
            TextChunker::new(ChunkConfig::new(0, 0)),
            Err(RagError::Configuration(_))
        ));
    }

    #[test]
    fn test_chunker_empty() {
        let c = chunker(10, 2);
        assert!(texts(&c, "").is_empty());
        assert!(texts(&c, "  \n\t ").is_empty());
    }

    #[test]
    fn test_chunker_small_text() {
        let c = chunker(700, 120);
        let text = "Returns are accepted within 30 days with a receipt.";
        assert_eq!(texts(&c, text), vec![text.to_string()]);
    }

    #[test]
    fn test_chunker_no_overlap() {
        let c = chunker(10, 0);
        assert_eq!(
            texts(&c, "0123456789abcdefghij"),
            vec!["0123456789", "abcdefghij"]
        );
    }

    #[test]
    fn test_chunker_overlap() {
        let c = chunker(10, 4);
        // 0..10, 6..16, 12..20
        assert_eq!(
            texts(&c, "0123456789abcdefghij"),
            vec!["0123456789", "6789abcdef", "cdefghij"]
        );
    }

    #[test]
    fn test_chunker_trims_outer_whitespace() {
        let c = chunker(10, 4);
        let spans: Vec<_> = c.chunks("  0123456789abcdefghij\n").collect();
        assert_eq!(spans[0].text, "0123456789");
        assert_eq!(spans[2].text, "cdefghij");
        assert_eq!(spans.iter().map(|s| s.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_chunker_verbatim() {
        // 줄바꿈/CRLF 등 원문은 그대로 유지
        let c = chunker(700, 120);
        let text = "line one\r\nline two\n\nline three";
        assert_eq!(texts(&c, text), vec![text.to_string()]);
    }

    #[test]
    fn test_chunker_unicode() {
        let c = chunker(4, 1);
        let chunks = texts(&c, "退货政策在三十天内有效");
        assert_eq!(chunks, vec!["退货政策", "策在三十", "十天内有", "有效"]);
    }

    #[test]
    fn test_chunker_deterministic() {
        let c = chunker(50, 10);
        let text = "Lorem ipsum dolor sit amet, 退货 consectetur adipiscing elit. ".repeat(20);
        assert_eq!(texts(&c, &text), texts(&c, &text));
    }

    #[test]
    fn test_chunker_covers_text() {
        let c = chunker(7, 3);
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = texts(&c, text);
        assert!(chunks.iter().all(|s| s.chars().count() <= 7));
        assert_eq!(chunks.first().map(String::as_str), Some("abcdefg"));
        assert!(chunks.last().is_some_and(|s| s.ends_with('z')));
    }

    #[test]
    fn test_chunk_document_indices_continue_across_pages() {
        let c = chunker(5, 0);
        let doc = Document {
            path: PathBuf::from("/docs/manual.pdf"),
            file_name: "manual.pdf".to_string(),
            file_type: FileType::Pdf,
            pages: vec![
                PageText {
                    page: Some(1),
                    text: "abcdefgh".to_string(),
                },
                PageText {
                    page: Some(2),
                    text: String::new(),
                },
                PageText {
                    page: Some(3),
                    text: "xyz".to_string(),
                },
            ],
        };

        let chunks: Vec<Chunk> = c.chunk_document(&doc).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].id, "manual.pdf|p1|c0");
        assert_eq!(chunks[1].text, "fgh");
        assert_eq!(chunks[2].page, Some(3));
        assert_eq!(chunks[2].chunk_index, 2);
        assert_eq!(chunks[2].source, "/docs/manual.pdf");
    }
}
