//! Fixed-size character windows with overlap.

use crate::error::ConfigError;
use crate::models::{Chunk, ChunkingConfig};

/// Text chunker that splits documents into overlapping windows.
///
/// Sizes are counted in characters, never bytes, so multi-byte text is never
/// split inside a code point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker, rejecting sizes that could not advance.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunk size must be at least 1".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self, ConfigError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into windows tagged with `source_index`.
    pub fn split(&self, text: &str, source_index: usize) -> Vec<Chunk> {
        // byte position of every char boundary, including the end of the text
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total_chars = bounds.len() - 1;

        if total_chars == 0 {
            return Vec::new();
        }

        let step = self.chunk_size - self.overlap;
        let mut chunks = Vec::with_capacity(total_chars.div_ceil(step));
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(total_chars);
            chunks.push(Chunk::new(
                &text[bounds[start]..bounds[end]],
                source_index,
                start,
            ));

            if end == total_chars {
                break;
            }
            start += step;
        }

        tracing::debug!(source_index, chunks = chunks.len(), "split document");
        chunks
    }

    /// Split every document, numbering sources by their position in `documents`.
    pub fn split_all<S: AsRef<str>>(&self, documents: &[S]) -> Vec<Chunk> {
        documents
            .iter()
            .enumerate()
            .flat_map(|(i, doc)| self.split(doc.as_ref(), i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_small_document_single_chunk() {
        let chunker = TextChunker::new(100, 10).unwrap();
        let chunks = chunker.split("Hello, world!", 3);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].source_index, 3);
        assert_eq!(chunks[0].offset, 0);
    }

    #[test]
    fn test_exact_size_document_single_chunk() {
        let chunker = TextChunker::new(5, 2).unwrap();
        assert_eq!(texts(&chunker.split("abcde", 0)), vec!["abcde"]);
    }

    #[test]
    fn test_empty_document() {
        let chunker = TextChunker::new(10, 2).unwrap();
        assert!(chunker.split("", 0).is_empty());
    }

    #[test]
    fn test_windows_and_offsets() {
        let chunker = TextChunker::new(4, 1).unwrap();
        let chunks = chunker.split("abcdefghij", 0);

        assert_eq!(texts(&chunks), vec!["abcd", "defg", "ghij"]);
        let offsets: Vec<usize> = chunks.iter().map(|c| c.offset).collect();
        assert_eq!(offsets, vec![0, 3, 6]);
    }

    #[test]
    fn test_short_terminal_chunk_without_duplicate() {
        let chunker = TextChunker::new(4, 2).unwrap();
        let chunks = chunker.split("abcdefg", 0);

        // the window ending exactly at the text end is the last one
        assert_eq!(texts(&chunks), vec!["abcd", "cdef", "efg"]);
    }

    #[test]
    fn test_zero_overlap() {
        let chunker = TextChunker::new(3, 0).unwrap();
        assert_eq!(
            texts(&chunker.split("abcdefgh", 0)),
            vec!["abc", "def", "gh"]
        );
    }

    #[test]
    fn test_overlap_region_is_shared() {
        let text: String = (0..437).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        for (size, overlap) in [(10, 3), (50, 49), (7, 0), (100, 20), (1, 0)] {
            let chunker = TextChunker::new(size, overlap).unwrap();
            let chunks = chunker.split(&text, 0);
            for pair in chunks.windows(2) {
                let prev: Vec<char> = pair[0].text.chars().collect();
                let next: Vec<char> = pair[1].text.chars().collect();
                assert_eq!(prev.len(), size);
                assert_eq!(&prev[size - overlap..], &next[..overlap.min(next.len())]);
            }
            let last = chunks.last().unwrap();
            assert_eq!(last.offset + last.char_len(), text.chars().count());
        }
    }

    #[test]
    fn test_multibyte_text_counts_characters() {
        let chunker = TextChunker::new(3, 1).unwrap();
        let chunks = chunker.split("日本語のテキスト", 0);

        assert_eq!(texts(&chunks), vec!["日本語", "語のテ", "テキス", "スト"]);
        assert_eq!(chunks[1].offset, 2);
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(matches!(
            TextChunker::new(10, 10),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(TextChunker::new(10, 11).is_err());
        assert!(TextChunker::new(0, 0).is_err());
    }

    #[test]
    fn test_from_config() {
        let config = ChunkingConfig::default();
        let chunker = TextChunker::from_config(&config).unwrap();
        assert_eq!(chunker.chunk_size(), 1000);
        assert_eq!(chunker.overlap(), 200);
    }

    #[test]
    fn test_split_all_numbers_sources() {
        let chunker = TextChunker::new(100, 0).unwrap();
        let chunks = chunker.split_all(&["first", "", "third"]);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].source_index, 0);
        assert_eq!(chunks[1].source_index, 2);
    }
}
