pub mod loader;
pub mod splitter;
pub mod types;

use std::path::{Path, PathBuf};

pub use loader::TextLoader;
pub use splitter::{SplitterConfig, TextSplitter};
pub use types::{Chunk, Document, Page};

#[cfg(feature = "pdf")]
pub use loader::PdfLoader;

use crate::error::IndexError;

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

pub trait DocumentLoader: Send + Sync {
    fn load(
        &self,
        path: &Path,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<Document>, IndexError>> + Send + '_>,
    >;

    fn supported_extensions(&self) -> &[&str];
}

/// Loads every supported file of a corpus directory and splits it into chunks.
pub struct DocumentIngestor {
    loaders: Vec<Box<dyn DocumentLoader>>,
    splitter: TextSplitter,
}

impl DocumentIngestor {
    /// Ingestor with the built-in loaders: text always, PDF when the `pdf` feature is on.
    #[must_use]
    pub fn new(splitter: TextSplitter) -> Self {
        Self::with_max_file_size(splitter, DEFAULT_MAX_FILE_SIZE)
    }

    /// Built-in loaders that reject files larger than `max_file_size` bytes.
    #[must_use]
    pub fn with_max_file_size(splitter: TextSplitter, max_file_size: u64) -> Self {
        let mut loaders: Vec<Box<dyn DocumentLoader>> = vec![Box::new(TextLoader { max_file_size })];
        #[cfg(feature = "pdf")]
        loaders.push(Box::new(PdfLoader { max_file_size }));
        Self { loaders, splitter }
    }

    #[must_use]
    pub fn with_loaders(splitter: TextSplitter, loaders: Vec<Box<dyn DocumentLoader>>) -> Self {
        Self { loaders, splitter }
    }

    #[must_use]
    pub fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }

    fn loader_for(&self, path: &Path) -> Option<&dyn DocumentLoader> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.loaders
            .iter()
            .find(|l| l.supported_extensions().contains(&ext.as_str()))
            .map(|l| &**l)
    }

    /// Supported files directly inside `dir`, sorted by file name.
    ///
    /// A missing directory is treated the same as an empty one.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed.
    pub async fn discover(&self, dir: &Path) -> Result<Vec<PathBuf>, IndexError> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if self.loader_for(&path).is_some() {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Load every supported document in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NoDocumentsFound`] when the directory holds no
    /// supported file, or the first loader error otherwise.
    pub async fn load_documents(&self, dir: &Path) -> Result<Vec<Document>, IndexError> {
        let files = self.discover(dir).await?;
        if files.is_empty() {
            return Err(IndexError::NoDocumentsFound {
                dir: dir.to_path_buf(),
            });
        }

        let mut documents = Vec::with_capacity(files.len());
        for path in &files {
            let Some(loader) = self.loader_for(path) else {
                continue;
            };
            let loaded = loader.load(path).await?;
            tracing::debug!(
                path = %path.display(),
                pages = loaded.iter().map(|d| d.pages.len()).sum::<usize>(),
                "loaded document"
            );
            documents.extend(loaded);
        }
        Ok(documents)
    }

    /// Split documents into chunks, preserving document then page order.
    #[must_use]
    pub fn split(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| self.splitter.split(doc))
            .collect()
    }

    /// [`load_documents`](Self::load_documents) followed by [`split`](Self::split).
    ///
    /// # Errors
    ///
    /// Propagates loading failures.
    pub async fn ingest(&self, dir: &Path) -> Result<Vec<Chunk>, IndexError> {
        let documents = self.load_documents(dir).await?;
        Ok(self.split(&documents))
    }
}
