use lectern_index::IndexError;
use lectern_llm::LlmError;

/// Errors surfaced by sessions, answer composition, and configuration.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The generation backend was unreachable, failed, returned nothing, or timed out.
    #[error("generation unavailable: {0}")]
    GenerationUnavailable(#[source] LlmError),

    /// Retrieval produced no chunks, so there is nothing to answer from.
    #[error("no course material matched the question")]
    EmptyContext,

    /// A required setting or credential is absent; names the key.
    #[error("missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// The index-level cause, if this error came from retrieval or loading.
    #[must_use]
    pub fn as_index(&self) -> Option<&IndexError> {
        match self {
            Self::Index(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_errors_convert_transparently() {
        let err: RagError = IndexError::IndexNotLoaded.into();
        assert_eq!(err.to_string(), IndexError::IndexNotLoaded.to_string());
        assert!(matches!(err.as_index(), Some(IndexError::IndexNotLoaded)));
    }

    #[test]
    fn generation_unavailable_keeps_source() {
        let err = RagError::GenerationUnavailable(LlmError::Other("connection refused".into()));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("connection refused"));
    }

    #[test]
    fn configuration_missing_names_key() {
        let err = RagError::ConfigurationMissing("LECTERN_API_KEY".into());
        assert!(err.to_string().contains("LECTERN_API_KEY"));
    }
}
