//! Shelf: an immutable pointer to one changeset.
//!
//! Shelves are how callers reason about history without touching the
//! working tree: two shelves can be compared through the DAG's ancestry
//! relations. A shelf never moves — operations that advance a branch hand
//! out new shelves.

use bindery_store::{RevisionId, VersionStore};

use crate::error::EngineError;
use crate::repository::Repository;

/// An immutable reference to a specific changeset.
#[derive(Clone, Copy)]
pub struct Shelf<'r, S: VersionStore> {
    repo: &'r Repository<S>,
    revision: RevisionId,
}

impl<'r, S: VersionStore> Shelf<'r, S> {
    pub(crate) const fn new(repo: &'r Repository<S>, revision: RevisionId) -> Self {
        Self { repo, revision }
    }

    /// The changeset this shelf points at.
    #[must_use]
    pub const fn revision(&self) -> RevisionId {
        self.revision
    }

    /// Is this shelf's changeset a strict ancestor of `other`'s?
    ///
    /// # Errors
    /// Fails when either revision is unknown to the store, or when called
    /// from inside an active transaction.
    pub fn ancestor_of(&self, other: &Self) -> Result<bool, EngineError> {
        self.repo.transaction(|txn| {
            Ok(txn.store_ref().is_ancestor(&self.revision, &other.revision)?)
        })
    }

    /// Is this shelf's changeset an immediate parent of `other`'s?
    ///
    /// # Errors
    /// Same conditions as [`Self::ancestor_of`].
    pub fn parent_of(&self, other: &Self) -> Result<bool, EngineError> {
        self.repo.transaction(|txn| {
            Ok(txn
                .store_ref()
                .parents(&other.revision)?
                .contains(&self.revision))
        })
    }

    /// Do the two shelves share at least one ancestor?
    ///
    /// Always true for shelves from one repository's connected history;
    /// the check distinguishes linear relations from true divergence.
    ///
    /// # Errors
    /// Same conditions as [`Self::ancestor_of`].
    pub fn has_common_ancestor_with(&self, other: &Self) -> Result<bool, EngineError> {
        self.repo.transaction(|txn| {
            Ok(txn
                .store_ref()
                .common_ancestor(&self.revision, &other.revision)?
                .is_some())
        })
    }
}

impl<S: VersionStore> PartialEq for Shelf<'_, S> {
    fn eq(&self, other: &Self) -> bool {
        self.revision == other.revision
    }
}

impl<S: VersionStore> Eq for Shelf<'_, S> {}

impl<S: VersionStore> std::fmt::Debug for Shelf<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Shelf({})", self.revision.short())
    }
}
