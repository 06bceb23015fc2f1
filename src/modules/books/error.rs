use std::path::PathBuf;

use shelfbot_http::error::AppError;
use thiserror::Error;

/// Failures raised by the catalogue, the book entity, and cover presentation.
#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("catalogue at {} is unavailable: {reason}", .path.display())]
    StorageUnavailable { path: PathBuf, reason: String },

    #[error("book field '{field}' {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("no book at position {index}; the catalogue holds {len}")]
    NotFound { index: usize, len: usize },

    #[error("cover image {url} could not be fetched: {reason}")]
    ImageFetchFailed { url: String, reason: String },
}

impl CatalogueError {
    pub(crate) fn storage(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::StorageUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn missing(field: &'static str) -> Self {
        Self::Validation {
            field,
            reason: "is missing".to_string(),
        }
    }

    /// Text shown to the chat user when an operation is aborted.
    pub fn user_message(&self) -> String {
        match self {
            CatalogueError::StorageUnavailable { .. } => {
                "The catalogue is unavailable right now. Please try again later.".to_string()
            }
            CatalogueError::Validation { field, reason } => {
                format!("The book could not be saved: {field} {reason}.")
            }
            CatalogueError::NotFound { index, .. } => {
                format!("There is no book number {} in the catalogue.", index + 1)
            }
            CatalogueError::ImageFetchFailed { .. } => {
                "The cover image could not be loaded.".to_string()
            }
        }
    }
}

impl From<CatalogueError> for AppError {
    fn from(err: CatalogueError) -> Self {
        let message = err.to_string();
        match err {
            CatalogueError::StorageUnavailable { .. } => AppError::unavailable(message),
            CatalogueError::Validation { field, reason } => AppError::validation(
                vec![serde_json::json!({ "field": field, "error": reason })],
                message,
            ),
            CatalogueError::NotFound { .. } => AppError::not_found(message),
            CatalogueError::ImageFetchFailed { .. } => AppError::Internal(anyhow::anyhow!(message)),
        }
    }
}
