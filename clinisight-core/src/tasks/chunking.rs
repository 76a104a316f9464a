use crate::error::{ClinisightError, Result};
use text_splitter::{Characters, ChunkConfig, TextSplitter};

pub const DEFAULT_CHUNK_SIZE: usize = 2000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Character-counted chunks of at most `chunk_size`, split at the highest
/// semantic boundary that fits, with `chunk_overlap` shared between neighbours.
pub struct Chunker {
    splitter: TextSplitter<Characters>,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let config = ChunkConfig::new(chunk_size)
            .with_overlap(chunk_overlap)
            .map_err(|e| ClinisightError::Config(format!("invalid chunking: {}", e)))?;

        Ok(Self {
            splitter: TextSplitter::new(config),
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }

    /// Trimmed, non-empty chunks in document order.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.splitter
            .chunks(text)
            .map(str::trim)
            .filter(|chunk| !chunk.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_text(count: usize) -> String {
        (0..count)
            .map(|i| format!("word{:04}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn short_text_is_a_single_trimmed_chunk() {
        let chunker = Chunker::with_defaults().unwrap();
        assert_eq!(
            chunker.split_text("  Title: A\n\nAbstract: B  "),
            vec!["Title: A\n\nAbstract: B"]
        );
    }

    #[test]
    fn empty_or_blank_text_has_no_chunks() {
        let chunker = Chunker::with_defaults().unwrap();
        assert!(chunker.split_text("").is_empty());
        assert!(chunker.split_text(" \n\n  ").is_empty());
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let chunker = Chunker::new(10, 0).unwrap();
        assert_eq!(
            chunker.split_text("para one\n\npara two"),
            vec!["para one", "para two"]
        );
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        assert!(matches!(
            Chunker::new(10, 20),
            Err(ClinisightError::Config(_))
        ));
    }

    #[test]
    fn long_text_respects_chunk_size() {
        let chunks = Chunker::with_defaults().unwrap().split_text(&word_text(1500));

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= DEFAULT_CHUNK_SIZE);
        }
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let text = word_text(1500);
        let chunker = Chunker::with_defaults().unwrap();
        let ranges: Vec<(usize, usize)> = chunker
            .splitter
            .chunk_indices(&text)
            .map(|(start, chunk)| (start, start + chunk.len()))
            .collect();

        assert!(ranges.len() > 1);
        for pair in ranges.windows(2) {
            assert!(pair[1].0 < pair[0].1, "expected overlap between {:?}", pair);
        }
    }
}
