//! The unit of text that is embedded, stored and retrieved.

use serde::{Deserialize, Serialize};

/// A contiguous span of source text produced by chunking.
///
/// Fragments are immutable once built: fields are only readable, and the
/// single builder method consumes the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    content: String,
    source_id: String,
    sequence_index: usize,
    start_offset: usize,
    end_offset: usize,
}

impl Fragment {
    /// Create a fragment covering `start_offset..end_offset` (bytes) of its source.
    pub fn new(
        content: impl Into<String>,
        sequence_index: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Self {
            content: content.into(),
            source_id: String::new(),
            sequence_index,
            start_offset,
            end_offset,
        }
    }

    /// Set the provenance of this fragment.
    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = source_id.into();
        self
    }

    /// The fragment text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Opaque provenance string, typically the originating file path.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Whether a provenance string has been attached.
    pub fn has_source(&self) -> bool {
        !self.source_id.is_empty()
    }

    /// Position among the fragments of the same source.
    pub fn sequence_index(&self) -> usize {
        self.sequence_index
    }

    pub fn start_offset(&self) -> usize {
        self.start_offset
    }

    pub fn end_offset(&self) -> usize {
        self.end_offset
    }

    /// Length of the content in characters.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_with_source() {
        let fragment = Fragment::new("hello", 3, 10, 15);
        assert!(!fragment.has_source());

        let fragment = fragment.with_source("docs/a.txt");
        assert!(fragment.has_source());
        assert_eq!(fragment.source_id(), "docs/a.txt");
        assert_eq!(fragment.sequence_index(), 3);
        assert_eq!(fragment.start_offset(), 10);
        assert_eq!(fragment.end_offset(), 15);
    }

    #[test]
    fn test_serializes_content_and_source() {
        let fragment = Fragment::new("dose: 5mg", 0, 0, 9).with_source("label.pdf");
        let json = serde_json::to_value(&fragment).unwrap();
        assert_eq!(json["content"], "dose: 5mg");
        assert_eq!(json["source_id"], "label.pdf");
    }
}
