//! Error types for store operations.
//!
//! [`StoreError`] is the single error type returned by all
//! [`VersionStore`](crate::VersionStore) trait methods. It uses rich enum
//! variants so callers can match on specific failure modes (missing branch,
//! unknown revision, nothing to commit) without parsing error messages.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{BranchName, FileId, RevisionId};

/// Errors returned by [`VersionStore`](crate::VersionStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The location exists but does not hold a valid store.
    #[error("not a store at {}: {reason}", path.display())]
    NotAStore {
        /// Path that was probed.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// A store already exists at the location.
    #[error("a store already exists at {}", path.display())]
    StoreExists {
        /// Path that already holds a store.
        path: PathBuf,
    },

    /// The requested branch does not exist.
    #[error("unknown branch `{name}`")]
    UnknownBranch {
        /// The branch that was looked up.
        name: BranchName,
    },

    /// The requested revision is not in the changeset graph.
    #[error("unknown revision {}", id.short())]
    UnknownRevision {
        /// The revision that was looked up.
        id: RevisionId,
    },

    /// The requested file is not tracked in the working tree.
    #[error("file `{id}` is not tracked")]
    FileNotTracked {
        /// The file id that was looked up.
        id: FileId,
    },

    /// A commit was requested with nothing staged and no working-tree change.
    #[error("nothing to commit on branch `{branch}`")]
    NothingToCommit {
        /// Branch the commit was aimed at.
        branch: BranchName,
    },

    /// Persisted store state could not be decoded.
    ///
    /// This is the catch-all for damaged `graph.json`/`state.json` or a
    /// missing blob. The `detail` should include enough context to diagnose
    /// the failure.
    #[error("corrupt store state at {}: {detail}", path.display())]
    Corrupt {
        /// Path of the damaged artifact.
        path: PathBuf,
        /// Freeform description of the damage.
        detail: String,
    },

    /// An I/O error occurred (file system access, persistence).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_branch() {
        let err = StoreError::UnknownBranch {
            name: BranchName::new("ghost").unwrap(),
        };
        assert_eq!(format!("{err}"), "unknown branch `ghost`");
    }

    #[test]
    fn display_unknown_revision_is_abbreviated() {
        let id: RevisionId = "ef".repeat(32).parse().unwrap();
        let err = StoreError::UnknownRevision { id };
        assert_eq!(format!("{err}"), "unknown revision efefefefefef");
    }

    #[test]
    fn display_nothing_to_commit() {
        let err = StoreError::NothingToCommit {
            branch: BranchName::new("default").unwrap(),
        };
        assert!(format!("{err}").contains("nothing to commit"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::other("disk full");
        let err: StoreError = io.into();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
