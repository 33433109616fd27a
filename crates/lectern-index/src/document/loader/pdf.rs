use std::path::Path;
use std::pin::Pin;

use super::super::{DEFAULT_MAX_FILE_SIZE, Document, DocumentLoader, Page};
use crate::error::IndexError;

pub struct PdfLoader {
    pub max_file_size: u64,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for PdfLoader {
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

            let source = path.display().to_string();
            let path_buf = path.clone();
            let pages = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_by_pages(&path_buf).map_err(|e| IndexError::Pdf {
                    path: path_buf.clone(),
                    reason: e.to_string(),
                })
            })
            .await
            .map_err(|e| IndexError::Io(std::io::Error::other(e)))??;

            Ok(vec![Document {
                source,
                content_type: "application/pdf".to_owned(),
                pages: pages
                    .into_iter()
                    .zip(1u32..)
                    .map(|(text, number)| Page { number, text })
                    .collect(),
            }])
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }
}
