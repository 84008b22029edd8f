//! Typed errors for the asset registry.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised by registry operations.
///
/// The registry never retries and never repairs a library; every failure is
/// handed back to the caller with enough context to report it.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse library {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid entry: {0}")]
    Validation(String),

    #[error("Library is read-only: {0}")]
    ReadOnly(String),
}

/// Coarse classification of a [`RegistryError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Storage,
    Parse,
    Validation,
    ReadOnly,
}

impl RegistryError {
    pub(crate) fn storage(path: &Path, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse(path: &Path, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Which kind of failure this is
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Validation(_) => ErrorKind::Validation,
            Self::ReadOnly(_) => ErrorKind::ReadOnly,
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
