//! Error handler for the user directory.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Enum representing directory errors.
///
/// `NotFound`, `AlreadyExists` and `Validation` carry the data-integrity
/// contract of the directory; `App` covers invariant violations in the
/// surrounding infrastructure, such as an unreadable id counter.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("\"{0}\" does not exist or was not found")]
    NotFound(String),

    #[error("\"{0}\" already exists")]
    AlreadyExists(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    App(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DirectoryError {
    /// Validation failure in the `expected X, saw Y` form.
    pub(crate) fn expected(
        rule: impl Into<String>,
        saw: impl std::fmt::Display,
    ) -> Self {
        Self::Validation(format!(
            "expected {}, saw `{saw}` instead",
            rule.into()
        ))
    }
}
