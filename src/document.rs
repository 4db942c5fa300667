//! Documents: handles over one file on one cabinet's branch.
//!
//! A document is a view, not a store of truth: it remembers the branch tip
//! it was derived from (its shelf) and a handle-local staged buffer for
//! pending content. The synchronization protocols live here — `update`
//! pulls the shared line into a personal branch, `share` publishes a
//! personal branch back, with the merge direction decided by the pure
//! functions in [`crate::sync`].

use bindery_store::{BranchName, FileId, MergeOutcome, RevisionId, VersionStore};
use tracing::{debug, info};

use crate::cabinet::Cabinet;
use crate::error::EngineError;
use crate::ident;
use crate::model::{CabinetKind, DocumentId};
use crate::repository::Repository;
use crate::shelf::Shelf;
use crate::sync::{AncestryFacts, ShareAction, share_action, update_needs_merge};

/// A handle to one document (or part) on one cabinet's branch.
#[derive(Debug)]
pub struct Document<'r, S: VersionStore> {
    repo: &'r Repository<S>,
    kind: CabinetKind,
    branch: BranchName,
    document: DocumentId,
    part: Option<String>,
    file: FileId,
    shelf: RevisionId,
    staged: Option<Vec<u8>>,
}

impl<'r, S: VersionStore> Document<'r, S> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) const fn new(
        repo: &'r Repository<S>,
        kind: CabinetKind,
        branch: BranchName,
        document: DocumentId,
        part: Option<String>,
        file: FileId,
        shelf: RevisionId,
    ) -> Self {
        Self {
            repo,
            kind,
            branch,
            document,
            part,
            file,
            shelf,
            staged: None,
        }
    }

    /// The document id this handle is bound to.
    #[must_use]
    pub const fn id(&self) -> &DocumentId {
        &self.document
    }

    /// The part name, when this handle views a part rather than the body.
    #[must_use]
    pub fn part(&self) -> Option<&str> {
        self.part.as_deref()
    }

    /// The revision this handle was last refreshed to.
    #[must_use]
    pub const fn shelf(&self) -> Shelf<'r, S> {
        Shelf::new(self.repo, self.shelf)
    }

    // -- content --

    /// Current content: the staged buffer when one is pending, otherwise
    /// the file at the branch tip.
    ///
    /// # Errors
    /// Fails with [`EngineError::DocumentNotFound`] when the file vanished
    /// from the branch.
    pub fn read(&self) -> Result<Vec<u8>, EngineError> {
        if let Some(staged) = &self.staged {
            return Ok(staged.clone());
        }
        let file = self.file.clone();
        let document = self.document.clone();
        self.repo.transaction(|txn| {
            txn.in_branch(&self.branch, |store| {
                store.read_file(&file).map_err(|e| match e {
                    bindery_store::StoreError::FileNotTracked { .. } => {
                        EngineError::DocumentNotFound { document: document.clone() }
                    }
                    other => other.into(),
                })
            })
        })
    }

    /// Content size in bytes, taken from file metadata without reading
    /// the content. Staged content reports its buffered length.
    ///
    /// # Errors
    /// Same conditions as [`Self::read`].
    pub fn size(&self) -> Result<u64, EngineError> {
        if let Some(staged) = &self.staged {
            return Ok(u64::try_from(staged.len()).unwrap_or(u64::MAX));
        }
        let file = self.file.clone();
        let document = self.document.clone();
        self.repo.transaction(|txn| {
            txn.in_branch(&self.branch, |store| {
                store.file_size(&file).map_err(|e| match e {
                    bindery_store::StoreError::FileNotTracked { .. } => {
                        EngineError::DocumentNotFound { document: document.clone() }
                    }
                    other => other.into(),
                })
            })
        })
    }

    /// Stage new content. Nothing reaches the store until [`Self::commit`].
    pub fn write(&mut self, content: impl Into<Vec<u8>>) {
        self.staged = Some(content.into());
    }

    /// Commit the staged content as a new changeset on this branch.
    ///
    /// # Errors
    /// Fails with [`EngineError::NothingToCommit`] when nothing is staged
    /// and the tree is unchanged.
    pub fn commit(&mut self, message: &str, author: &str) -> Result<Shelf<'r, S>, EngineError> {
        let staged = self.staged.take();
        let file = self.file.clone();
        let rev = self.repo.transaction(|txn| {
            txn.in_branch(&self.branch, |store| {
                if let Some(content) = &staged {
                    store.write_file(&file, content)?;
                    if !store.file_exists(&file) {
                        store.add_file(&file)?;
                    }
                }
                Ok(store.commit(message, author)?)
            })
        })?;
        self.shelf = rev;
        debug!(branch = %self.branch, rev = %rev.short(), "document committed");
        Ok(Shelf::new(self.repo, rev))
    }

    // -- the shared line --

    /// The equivalent document handle on the Main Cabinet.
    ///
    /// # Errors
    /// Fails with [`EngineError::DocumentNotFound`] when the document has
    /// never reached the shared line.
    pub fn shared_version(&self) -> Result<Document<'r, S>, EngineError> {
        Cabinet::main(self.repo).retrieve(Some(self.document.as_str()))
    }

    // -- synchronization --

    /// Pull shared changes into this personal branch.
    ///
    /// A no-op on the Main Cabinet, when the two tips coincide, when the
    /// shared changes are already present, or when the shared tip is the
    /// merge of this very branch. Returns whether a merge commit was made.
    ///
    /// # Errors
    /// Fails with [`EngineError::MergeConflict`] when the merge leaves
    /// unresolved files; no changeset is created in that case.
    pub fn update(&mut self) -> Result<bool, EngineError> {
        if self.kind == CabinetKind::Main {
            return Ok(false);
        }
        let branch = self.branch.clone();
        let document = self.document.clone();
        let repo = self.repo;
        let merged = repo.transaction(|txn| {
            let store = txn.store();
            let local = store.branch_tip(&branch)?;
            let main = store.branch_tip(repo.main_branch())?;
            if local == main {
                return Ok(None);
            }
            let facts = gather_facts(store, &branch, &local, &main)?;
            if !update_needs_merge(facts) {
                debug!(%branch, "update: shared changes already present");
                return Ok(None);
            }
            let rev = txn.in_branch(&branch, |store| {
                merge_scoped(store, &main, &document)?;
                Ok(store.commit(
                    &format!("[AUTO] Merged shared changes into '{branch}'."),
                    repo.system_author(),
                )?)
            })?;
            info!(%branch, rev = %rev.short(), "update merged shared changes");
            Ok(Some(rev))
        })?;
        if let Some(rev) = merged {
            self.shelf = rev;
        }
        Ok(merged.is_some())
    }

    /// Publish this personal branch's changes to the shared line.
    ///
    /// The merge direction follows the ancestry between the two tips; see
    /// [`crate::sync::share_action`]. Returns the action taken. The handle
    /// is refreshed to its branch's resulting tip.
    ///
    /// # Errors
    /// Fails with [`EngineError::MergeConflict`] when any merge leaves
    /// unresolved files; the offending changeset is not created.
    pub fn share(&mut self, message: &str) -> Result<ShareAction, EngineError> {
        let CabinetKind::Personal { user, .. } = &self.kind else {
            // The shared line shares with no one.
            return Ok(ShareAction::UpToDate);
        };
        let author = user.as_str().to_owned();
        let branch = self.branch.clone();
        let document = self.document.clone();
        let repo = self.repo;

        let (action, tip) = repo.transaction(|txn| {
            let main_branch = repo.main_branch().clone();
            let store = txn.store();
            let local = store.branch_tip(&branch)?;
            let main = store.branch_tip(&main_branch)?;
            if local == main {
                return Ok((ShareAction::UpToDate, local));
            }
            let facts = gather_facts(store, &branch, &local, &main)?;
            let action = share_action(facts);
            debug!(%branch, ?facts, ?action, "share decision");

            match action {
                ShareAction::UpToDate => {}
                ShareAction::PublishLocal => {
                    publish(txn, &main_branch, &local, &document, message, &author)?;
                }
                ShareAction::RefreshLocalOnly => {
                    refresh_local(txn, repo, &branch, &main, &document)?;
                }
                ShareAction::FullExchange => {
                    refresh_local(txn, repo, &branch, &main, &document)?;
                    let refreshed = txn.store_ref().branch_tip(&branch)?;
                    publish(txn, &main_branch, &refreshed, &document, message, &author)?;
                }
            }
            let tip = txn.store_ref().branch_tip(&branch)?;
            Ok((action, tip))
        })?;

        self.shelf = tip;
        info!(%branch, ?action, "share complete");
        Ok(action)
    }
}

// ---------------------------------------------------------------------------
// Protocol helpers
// ---------------------------------------------------------------------------

/// Gather the ancestry facts the merge-direction decision needs.
///
/// `local` and `main` must be distinct; callers short-circuit equality.
fn gather_facts<S: VersionStore>(
    store: &S,
    personal_branch: &BranchName,
    local: &RevisionId,
    main: &RevisionId,
) -> Result<AncestryFacts, EngineError> {
    let previously_linked = match store.common_ancestor(local, main)? {
        Some(ancestor) => store.branch_of(&ancestor)? == *personal_branch,
        None => false,
    };
    Ok(AncestryFacts {
        main_is_ancestor_of_local: store.is_ancestor(main, local)?,
        local_is_ancestor_of_main: store.is_ancestor(local, main)?,
        local_is_parent_of_main: store.parents(main)?.contains(local),
        previously_linked,
    })
}

/// Merge `rev` into the current working tree, scoped to one document.
///
/// Personal branches drop every unrelated file at creation, so a raw merge
/// would carry those deletions into the shared line (and carry unrelated
/// shared files back into a personal branch). Files the document does not
/// own are therefore pinned to the destination branch's own tip state:
/// the merge only ever moves the document's files.
fn merge_scoped<S: VersionStore>(
    store: &mut S,
    rev: &RevisionId,
    document: &DocumentId,
) -> Result<MergeOutcome, EngineError> {
    let tip = store
        .working_revision()
        .ok_or_else(|| EngineError::InvalidOperation {
            detail: "cannot merge into a branch with no commits".to_owned(),
        })?;
    let outcome = store.merge(rev)?;

    // Restore foreign files to the destination tip's state.
    let at_tip = store.tracked_files_at(&tip)?;
    let foreign_extras: Vec<FileId> = store
        .list_tracked_files()
        .into_iter()
        .filter(|id| !ident::file_belongs_to(id, document) && !at_tip.contains(id))
        .collect();
    store.remove_files(&foreign_extras)?;
    for id in &at_tip {
        if ident::file_belongs_to(id, document) {
            continue;
        }
        let content = store.read_file_at(&tip, id)?;
        store.write_file(id, &content)?;
        if !store.file_exists(id) {
            store.add_file(id)?;
        }
    }

    let MergeOutcome {
        updated,
        merged,
        removed,
        unresolved,
    } = outcome;
    let unresolved: Vec<FileId> = unresolved
        .into_iter()
        .filter(|id| ident::file_belongs_to(id, document))
        .collect();
    if unresolved.is_empty() {
        Ok(MergeOutcome {
            updated,
            merged,
            removed,
            unresolved,
        })
    } else {
        Err(EngineError::MergeConflict { files: unresolved })
    }
}

/// Merge `local` into the shared line and commit there.
fn publish<S: VersionStore>(
    txn: &mut crate::repository::Txn<'_, S>,
    main_branch: &BranchName,
    local: &RevisionId,
    document: &DocumentId,
    message: &str,
    author: &str,
) -> Result<(), EngineError> {
    let local = *local;
    txn.in_branch(main_branch, |store| {
        merge_scoped(store, &local, document)?;
        store.commit(message, author)?;
        Ok(())
    })
}

/// Merge the shared tip back into the personal branch.
fn refresh_local<S: VersionStore>(
    txn: &mut crate::repository::Txn<'_, S>,
    repo: &Repository<S>,
    branch: &BranchName,
    main: &RevisionId,
    document: &DocumentId,
) -> Result<(), EngineError> {
    let main = *main;
    txn.in_branch(branch, |store| {
        merge_scoped(store, &main, document)?;
        store.commit(
            &format!("[AUTO] Merged shared changes into '{branch}'."),
            repo.system_author(),
        )?;
        Ok(())
    })
}
