//! Error types for the bindery engine.
//!
//! Defines [`EngineError`], the unified error type for repository, cabinet,
//! and document operations. Messages are designed to be self-explanatory:
//! each variant says what went wrong and, where a fix exists, how to get
//! unstuck.
//!
//! Storage-backend details never leak past this module — everything is
//! expressed in terms of the engine's own vocabulary (repositories,
//! cabinets, documents, shelves).

use std::fmt;
use std::path::PathBuf;

use bindery_store::{FileId, StoreError};

use crate::model::{DocumentId, UserId};

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Unified error type for bindery operations.
#[derive(Debug)]
pub enum EngineError {
    /// The given path does not hold a repository.
    NotARepository {
        /// The path that was checked.
        path: PathBuf,
    },

    /// A repository already exists at the given path.
    RepositoryExists {
        /// The path that is already occupied.
        path: PathBuf,
    },

    /// A repository could not be initialized.
    CreateFailed {
        /// The target path.
        path: PathBuf,
        /// Description of the failure.
        detail: String,
    },

    /// The requested personal cabinet does not exist.
    CabinetNotFound {
        /// The document the cabinet would be bound to.
        document: DocumentId,
        /// The owning user.
        user: UserId,
    },

    /// The requested document does not exist in the cabinet.
    DocumentNotFound {
        /// The missing document.
        document: DocumentId,
    },

    /// A document with this id already exists.
    DocumentExists {
        /// The conflicting document id.
        document: DocumentId,
    },

    /// The operation is not valid for this cabinet or document state.
    InvalidOperation {
        /// Description of what was attempted and why it is not allowed.
        detail: String,
    },

    /// A merge between branches produced conflicts.
    MergeConflict {
        /// The files left unresolved.
        files: Vec<FileId>,
    },

    /// A transaction was opened from inside an already-active transaction
    /// on the same repository.
    ReentrantTransaction,

    /// A commit was requested but the working state is unchanged.
    NothingToCommit,

    /// A user or document identifier failed validation.
    InvalidId {
        /// The raw value that was rejected.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A configuration file could not be loaded or parsed.
    Config {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the problem.
        detail: String,
    },

    /// The storage layer reported an error.
    Store(StoreError),

    /// An I/O error occurred outside the storage layer.
    Io(std::io::Error),
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotARepository { path } => {
                write!(
                    f,
                    "no repository at '{}'.\n  To fix: initialize one first:\n    bindery init {}",
                    path.display(),
                    path.display()
                )
            }
            Self::RepositoryExists { path } => {
                write!(
                    f,
                    "a repository already exists at '{}'.\n  To fix: open it instead of initializing, or choose another path.",
                    path.display()
                )
            }
            Self::CreateFailed { path, detail } => {
                write!(
                    f,
                    "could not initialize a repository at '{}': {}",
                    path.display(),
                    detail
                )
            }
            Self::CabinetNotFound { document, user } => {
                write!(
                    f,
                    "no personal cabinet for document '{document}' owned by '{user}'.\n  To fix: request the cabinet with creation enabled, e.g.:\n    bindery edit {document} --user {user}"
                )
            }
            Self::DocumentNotFound { document } => {
                write!(
                    f,
                    "document '{document}' not found.\n  To fix: list available documents:\n    bindery docs"
                )
            }
            Self::DocumentExists { document } => {
                write!(
                    f,
                    "document '{document}' already exists.\n  To fix: pick a different id, or open the existing document."
                )
            }
            Self::InvalidOperation { detail } => {
                write!(f, "invalid operation: {detail}")
            }
            Self::MergeConflict { files } => {
                write!(f, "merge conflict in {} file(s):", files.len())?;
                for id in files {
                    write!(f, "\n  - {id}")?;
                }
                write!(
                    f,
                    "\n  To fix: resolve the conflict markers in each file, commit, and retry."
                )
            }
            Self::ReentrantTransaction => {
                write!(
                    f,
                    "a transaction is already active on this repository from the current thread.\n  Nested transactions are not supported; finish the outer one first."
                )
            }
            Self::NothingToCommit => {
                write!(f, "nothing to commit: the working state is unchanged.")
            }
            Self::InvalidId { value, reason } => {
                write!(f, "invalid identifier '{value}': {reason}")
            }
            Self::Config { path, detail } => {
                write!(
                    f,
                    "configuration error in '{}': {}\n  To fix: edit the config file and correct the issue.",
                    path.display(),
                    detail
                )
            }
            Self::Store(err) => write!(f, "storage error: {err}"),
            Self::Io(err) => {
                write!(
                    f,
                    "I/O error: {err}\n  To fix: check file permissions and disk space."
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// std::error::Error
// ---------------------------------------------------------------------------

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// From impls
// ---------------------------------------------------------------------------

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotAStore { path, .. } => Self::NotARepository { path },
            StoreError::StoreExists { path } => Self::RepositoryExists { path },
            StoreError::NothingToCommit { .. } => Self::NothingToCommit,
            other => Self::Store(other),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<crate::config::ConfigError> for EngineError {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config {
            path: err.path.unwrap_or_default(),
            detail: err.message,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
