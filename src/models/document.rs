use serde::{Deserialize, Serialize};

/// A window of a source document produced by the chunker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Position of the source document in the batch passed to indexing.
    pub source_index: usize,
    /// Character offset of the first character of `text` in the source document.
    pub offset: usize,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source_index: usize, offset: usize) -> Self {
        Self {
            text: text.into(),
            source_index,
            offset,
        }
    }

    /// Number of characters in the chunk.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Payload stored alongside each vector in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub text: String,
    pub source_index: usize,
    pub offset: usize,
}

impl From<Chunk> for ChunkPayload {
    fn from(chunk: Chunk) -> Self {
        Self {
            text: chunk.text,
            source_index: chunk.source_index,
            offset: chunk.offset,
        }
    }
}
