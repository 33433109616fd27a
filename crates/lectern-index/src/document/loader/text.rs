use std::path::Path;
use std::pin::Pin;

use super::super::{DEFAULT_MAX_FILE_SIZE, Document, DocumentLoader, Page};
use crate::error::IndexError;

const PAGE_BREAK: char = '\x0c';

/// Plain text and Markdown. Form feeds separate pages.
pub struct TextLoader {
    pub max_file_size: u64,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

fn paginate(content: &str) -> Vec<Page> {
    content
        .split(PAGE_BREAK)
        .zip(1u32..)
        .map(|(text, number)| Page {
            number,
            text: text.to_owned(),
        })
        .collect()
}

impl DocumentLoader for TextLoader {
    fn load(
        &self,
        path: &Path,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Document>, IndexError>> + Send + '_>>
    {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            let meta = tokio::fs::metadata(&path).await?;
            if meta.len() > max_size {
                return Err(IndexError::FileTooLarge {
                    path,
                    size: meta.len(),
                });
            }

            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();

            let content_type = match ext.as_str() {
                "md" | "markdown" => "text/markdown",
                _ => "text/plain",
            };

            let content = tokio::fs::read_to_string(&path).await?;

            Ok(vec![Document {
                source: path.display().to_string(),
                content_type: content_type.to_owned(),
                pages: paginate(&content),
            }])
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt", "md", "markdown"]
    }
}
