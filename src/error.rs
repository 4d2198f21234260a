use thiserror::Error;

/// Main error type for the waybill stamping pipeline
#[derive(Error, Debug)]
pub enum StampError {
    #[error("input PDF not found: {path}")]
    InputNotFound { path: String },

    #[error("input PDF could not be read: {message}")]
    InputUnreadable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("failed to write output PDF: {path}")]
    OutputWrite {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("PDF structure error: {0}")]
    PdfStructure(#[from] lopdf::Error),

    #[error("file I/O error: {path}")]
    FileIO {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("general error: {0}")]
    General(#[from] anyhow::Error),
}

impl StampError {
    pub fn input_not_found(path: impl Into<String>) -> Self {
        Self::InputNotFound { path: path.into() }
    }

    pub fn input_unreadable(message: impl Into<String>) -> Self {
        Self::InputUnreadable {
            message: message.into(),
            source: None,
        }
    }

    pub fn input_unreadable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::InputUnreadable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn output_write(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::OutputWrite {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub fn file_io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileIO {
            path: path.into(),
            source,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Check if error is recoverable (can continue operation)
    pub fn is_recoverable(&self) -> bool {
        match self {
            StampError::InputNotFound { .. } => true,
            StampError::InputUnreadable { .. } => true,
            StampError::Configuration { .. } => true,
            StampError::OutputWrite { .. } => false,
            StampError::PdfStructure(_) => false,
            StampError::FileIO { .. } => false,
            _ => true,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            StampError::InputNotFound { path } => {
                format!("The file '{}' was not found. Check the path and try again.", path)
            }
            StampError::InputUnreadable { .. } => {
                "Couldn't read this PDF. It might be encrypted or corrupted.".to_string()
            }
            StampError::OutputWrite { path, .. } => {
                format!("Couldn't write the output PDF to '{}'. Check permissions and disk space.", path)
            }
            StampError::FileIO { .. } => {
                "File access error. Check file permissions and disk space.".to_string()
            }
            StampError::Configuration { message } => {
                format!("Configuration problem: {}", message)
            }
            _ => "Something went wrong. Check the logs for details.".to_string(),
        }
    }
}

/// Result type alias for convenience
pub type StampResult<T> = Result<T, StampError>;

/// Error context for adding additional information
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> StampResult<T>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_context(self, context: &str) -> StampResult<T> {
        self.map_err(|e| StampError::InputUnreadable {
            message: context.to_string(),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_name_the_path() {
        let err = StampError::input_not_found("waybills.pdf");
        assert!(err.user_message().contains("waybills.pdf"));
    }

    #[test]
    fn test_with_context_keeps_the_source() {
        let io: Result<(), _> =
            Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "truncated"));
        let err = io.with_context("failed to load PDF").unwrap_err();
        match &err {
            StampError::InputUnreadable { message, source } => {
                assert_eq!(message, "failed to load PDF");
                assert!(source.is_some());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert!(err.user_message().contains("Couldn't read"));
    }

    #[test]
    fn test_recoverability() {
        assert!(StampError::input_unreadable("bad header").is_recoverable());
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!StampError::output_write("out.pdf", io).is_recoverable());
    }
}
