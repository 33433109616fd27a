use std::path::Path;

use serde::{Deserialize, Serialize};

/// One page of extracted text; `number` starts at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub text: String,
}

/// A loaded source file and its pages in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: String,
    pub content_type: String,
    pub pages: Vec<Page>,
}

/// A span of one page of one document; the unit that gets embedded and retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub page: u32,
    /// Position of this chunk within its document, counted across pages.
    pub chunk_index: usize,
}

impl Chunk {
    /// File name of the source document, without directories.
    #[must_use]
    pub fn source_name(&self) -> &str {
        Path::new(&self.source)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_name_strips_directories() {
        let chunk = Chunk {
            text: "x".into(),
            source: "/data/course_materials/lecture03.pdf".into(),
            page: 2,
            chunk_index: 0,
        };
        assert_eq!(chunk.source_name(), "lecture03.pdf");
    }

    #[test]
    fn source_name_plain_file() {
        let chunk = Chunk {
            text: "x".into(),
            source: "notes.txt".into(),
            page: 1,
            chunk_index: 0,
        };
        assert_eq!(chunk.source_name(), "notes.txt");
    }

    #[test]
    fn chunk_json_shape() {
        let chunk = Chunk {
            text: "gradient".into(),
            source: "a.pdf".into(),
            page: 3,
            chunk_index: 7,
        };
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["page"], 3);
        assert_eq!(json["chunk_index"], 7);
        assert_eq!(json["source"], "a.pdf");
    }
}
