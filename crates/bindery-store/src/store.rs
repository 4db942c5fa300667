//! The [`VersionStore`] trait — the single abstraction boundary between the
//! bindery engine and changeset storage.
//!
//! The engine interacts with storage exclusively through this trait. The
//! trait is object-safe so callers can hold `Box<dyn VersionStore>` when
//! they need runtime backend selection.
//!
//! # The working tree
//!
//! Every store exposes exactly one working tree: a mutable checkout of one
//! revision, plus a branch label that names the branch the next commit will
//! extend. All mutating operations act on that single tree, which is why the
//! engine serializes access behind a repository-wide lock. Ancestry queries
//! ([`common_ancestor`](VersionStore::common_ancestor),
//! [`is_ancestor`](VersionStore::is_ancestor),
//! [`parents`](VersionStore::parents)) read only the immutable changeset
//! graph and never touch the tree.

use crate::error::StoreError;
use crate::types::{BranchName, FileId, MergeOutcome, RevisionId};

/// The storage abstraction used by the bindery engine.
///
/// Implementations may persist the changeset graph on disk (the provided
/// [`FsStore`](crate::FsStore)) or keep it entirely in memory for tests.
#[allow(clippy::missing_errors_doc)]
pub trait VersionStore {
    // -----------------------------------------------------------------------
    // Working tree
    // -----------------------------------------------------------------------

    /// Replace the working tree with `rev`'s snapshot.
    ///
    /// Sets the working parent to `rev` and the branch label to `rev`'s
    /// branch. Any uncommitted working-tree state is discarded.
    fn checkout(&mut self, rev: &RevisionId) -> Result<(), StoreError>;

    /// Merge `rev` into the working tree.
    ///
    /// Computes the common ancestor of the working parent and `rev`, then
    /// performs a per-file three-way merge. Clean results are written to the
    /// working files; conflicted files are written with conflict markers and
    /// listed in the outcome's `unresolved`. Records `rev` as the second
    /// parent, so the next [`commit`](Self::commit) produces a two-parent
    /// changeset.
    fn merge(&mut self, rev: &RevisionId) -> Result<MergeOutcome, StoreError>;

    /// Commit the working tree as a new changeset on the labeled branch.
    ///
    /// Returns the new revision and advances the branch tip. Fails with
    /// [`StoreError::NothingToCommit`] when a parent exists, no merge is in
    /// progress, the snapshot is unchanged, and the branch label matches
    /// the parent's; a branch's root commit is always allowed.
    fn commit(&mut self, message: &str, author: &str) -> Result<RevisionId, StoreError>;

    /// The branch label the next commit will extend.
    fn active_branch(&self) -> &BranchName;

    /// Set the branch label without moving the checkout.
    ///
    /// This is how a new branch is started: checkout the parent, relabel,
    /// commit.
    fn set_active_branch(&mut self, name: &BranchName) -> Result<(), StoreError>;

    /// The revision the working tree is based on; `None` before the first
    /// commit of a fresh store.
    fn working_revision(&self) -> Option<RevisionId>;

    // -----------------------------------------------------------------------
    // Branches
    // -----------------------------------------------------------------------

    /// Resolve a branch to its tip revision.
    fn branch_tip(&self, name: &BranchName) -> Result<RevisionId, StoreError>;

    /// Whether a branch exists (has at least one commit).
    fn branch_exists(&self, name: &BranchName) -> bool;

    // -----------------------------------------------------------------------
    // Working-tree files
    // -----------------------------------------------------------------------

    /// Whether `id` is tracked in the working tree.
    fn file_exists(&self, id: &FileId) -> bool;

    /// Start tracking `id`. The file must already have been written with
    /// [`write_file`](Self::write_file).
    fn add_file(&mut self, id: &FileId) -> Result<(), StoreError>;

    /// Stop tracking the given files and delete them from the working tree.
    /// Untracked ids are skipped.
    fn remove_files(&mut self, ids: &[FileId]) -> Result<(), StoreError>;

    /// Read a tracked file's working-tree content.
    fn read_file(&self, id: &FileId) -> Result<Vec<u8>, StoreError>;

    /// Write a file's working-tree content. Does not track it; pair with
    /// [`add_file`](Self::add_file) for new files.
    fn write_file(&mut self, id: &FileId, data: &[u8]) -> Result<(), StoreError>;

    /// Size in bytes of a tracked file's working-tree content, without
    /// reading the content itself.
    fn file_size(&self, id: &FileId) -> Result<u64, StoreError>;

    /// All tracked file ids, sorted.
    fn list_tracked_files(&self) -> Vec<FileId>;

    /// The file ids tracked in `rev`'s snapshot, sorted.
    fn tracked_files_at(&self, rev: &RevisionId) -> Result<Vec<FileId>, StoreError>;

    /// Read a file's content as of `rev`, without touching the working
    /// tree. Fails with [`StoreError::FileNotTracked`] when the snapshot
    /// does not contain the file.
    fn read_file_at(&self, rev: &RevisionId, id: &FileId) -> Result<Vec<u8>, StoreError>;

    // -----------------------------------------------------------------------
    // Ancestry (immutable graph, no working-tree access)
    // -----------------------------------------------------------------------

    /// The best (highest-generation) common ancestor of `a` and `b`, or
    /// `None` when the revisions share no history.
    fn common_ancestor(
        &self,
        a: &RevisionId,
        b: &RevisionId,
    ) -> Result<Option<RevisionId>, StoreError>;

    /// Whether `a` is a strict ancestor of `b` (`a != b` and `a` is
    /// reachable from `b` through parent links).
    fn is_ancestor(&self, a: &RevisionId, b: &RevisionId) -> Result<bool, StoreError>;

    /// The parent revisions of `rev` (empty for a root commit, two entries
    /// for a merge).
    fn parents(&self, rev: &RevisionId) -> Result<Vec<RevisionId>, StoreError>;

    /// The branch a revision was committed on.
    fn branch_of(&self, rev: &RevisionId) -> Result<BranchName, StoreError>;
}
