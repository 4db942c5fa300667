//! Cabinets: named branches holding documents.
//!
//! A cabinet is a view over one branch. The Main Cabinet is the shared
//! line every document is published to; a Personal Cabinet binds one user
//! to one document on a private branch forked from the shared line. The
//! isolation invariant holds from the moment a personal branch is created:
//! its tree contains only files belonging to the bound document.

use bindery_store::{FileId, VersionStore};
use tracing::{debug, info};

use crate::document::Document;
use crate::error::EngineError;
use crate::ident;
use crate::model::{CabinetKind, DocumentId, UserId};
use crate::repository::Repository;
use crate::shelf::Shelf;

/// A named branch holding documents — the shared line or a personal one.
#[derive(Debug)]
pub struct Cabinet<'r, S: VersionStore> {
    repo: &'r Repository<S>,
    kind: CabinetKind,
    branch: bindery_store::BranchName,
}

impl<'r, S: VersionStore> Cabinet<'r, S> {
    pub(crate) fn main(repo: &'r Repository<S>) -> Self {
        Self {
            repo,
            kind: CabinetKind::Main,
            branch: repo.main_branch().clone(),
        }
    }

    pub(crate) fn personal(
        repo: &'r Repository<S>,
        document: DocumentId,
        user: UserId,
        create: bool,
    ) -> Result<Self, EngineError> {
        let branch = ident::personal_branch(&user, &document)?;
        let exists = repo.transaction(|txn| Ok(txn.store_ref().branch_exists(&branch)))?;
        if !exists {
            if !create {
                return Err(EngineError::CabinetNotFound { document, user });
            }
            create_branch(repo, &branch, &document)?;
        }
        Ok(Self {
            repo,
            kind: CabinetKind::Personal { document, user },
            branch,
        })
    }

    /// What this cabinet is bound to.
    #[must_use]
    pub const fn kind(&self) -> &CabinetKind {
        &self.kind
    }

    /// The branch this cabinet views.
    #[must_use]
    pub const fn branch(&self) -> &bindery_store::BranchName {
        &self.branch
    }

    /// The cabinet's current tip.
    ///
    /// # Errors
    /// Fails when the branch is missing from the store.
    pub fn shelf(&self) -> Result<Shelf<'r, S>, EngineError> {
        let tip = self
            .repo
            .transaction(|txn| Ok(txn.store_ref().branch_tip(&self.branch)?))?;
        Ok(Shelf::new(self.repo, tip))
    }

    /// Document ids tracked at this cabinet's tip, recomputed per call.
    ///
    /// # Errors
    /// Fails on store errors while walking the tip's tracked files.
    pub fn documents(&self) -> Result<Vec<DocumentId>, EngineError> {
        let pattern = document_pattern()?;
        self.repo.transaction(|txn| {
            txn.in_branch(&self.branch, |store| {
                Ok(store
                    .list_tracked_files()
                    .into_iter()
                    .filter(|id| pattern.matches(id.as_str()))
                    .filter_map(|id| ident::parse_body_file(&id))
                    .collect())
            })
        })
    }

    /// Does the selected document (or part) exist on this cabinet's branch?
    ///
    /// On the Main Cabinet the selector names a document and is mandatory;
    /// on a Personal Cabinet it names a part of the bound document, `None`
    /// meaning the document body.
    ///
    /// # Errors
    /// Fails with [`EngineError::InvalidOperation`] for a missing selector
    /// on the Main Cabinet.
    pub fn exists(&self, selector: Option<&str>) -> Result<bool, EngineError> {
        let (_, _, file) = self.resolve(selector)?;
        self.repo
            .transaction(|txn| txn.in_branch(&self.branch, |store| Ok(store.file_exists(&file))))
    }

    /// Fetch a document handle for the selection.
    ///
    /// # Errors
    /// Fails with [`EngineError::DocumentNotFound`] when the selection is
    /// not tracked on this branch, or [`EngineError::InvalidOperation`]
    /// for a missing selector on the Main Cabinet.
    pub fn retrieve(&self, selector: Option<&str>) -> Result<Document<'r, S>, EngineError> {
        let (document, part, file) = self.resolve(selector)?;
        let tip = self.repo.transaction(|txn| {
            let tip = txn.store_ref().branch_tip(&self.branch)?;
            let present =
                txn.in_branch(&self.branch, |store| Ok(store.file_exists(&file)))?;
            if !present {
                return Err(EngineError::DocumentNotFound { document: document.clone() });
            }
            Ok(tip)
        })?;
        Ok(Document::new(
            self.repo,
            self.kind.clone(),
            self.branch.clone(),
            document,
            part,
            file,
            tip,
        ))
    }

    /// Create the selected document (or part) with `content` and commit it.
    ///
    /// # Errors
    /// Fails with [`EngineError::DocumentExists`] when the target file is
    /// already tracked on this branch.
    pub fn create(
        &self,
        selector: Option<&str>,
        content: &[u8],
    ) -> Result<Document<'r, S>, EngineError> {
        let (document, part, file) = self.resolve(selector)?;
        let tip = self.repo.transaction(|txn| {
            txn.in_branch(&self.branch, |store| {
                if store.file_exists(&file) {
                    return Err(EngineError::DocumentExists {
                        document: document.clone(),
                    });
                }
                store.write_file(&file, content)?;
                store.add_file(&file)?;
                let rev =
                    store.commit(&format!("[AUTO] Created '{file}'."), self.repo.system_author())?;
                Ok(rev)
            })
        })?;
        info!(branch = %self.branch, file = %file, "document created");
        Ok(Document::new(
            self.repo,
            self.kind.clone(),
            self.branch.clone(),
            document,
            part,
            file,
            tip,
        ))
    }

    /// The bound document of a personal cabinet.
    ///
    /// # Errors
    /// Fails with [`EngineError::InvalidOperation`] on the Main Cabinet,
    /// which has no single bound document.
    pub fn document(&self) -> Result<Document<'r, S>, EngineError> {
        self.retrieve(None)
    }

    /// Map a selector to (document, part, file id) under this cabinet's
    /// selector semantics.
    fn resolve(
        &self,
        selector: Option<&str>,
    ) -> Result<(DocumentId, Option<String>, FileId), EngineError> {
        match (&self.kind, selector) {
            (CabinetKind::Main, Some(name)) => {
                let document = DocumentId::new(name)?;
                let file = ident::body_file(&document)?;
                Ok((document, None, file))
            }
            (CabinetKind::Main, None) => Err(EngineError::InvalidOperation {
                detail: "the Main Cabinet has no single bound document; name one explicitly"
                    .to_owned(),
            }),
            (CabinetKind::Personal { document, .. }, None) => {
                let file = ident::body_file(document)?;
                Ok((document.clone(), None, file))
            }
            (CabinetKind::Personal { document, .. }, Some(part)) => {
                let file = ident::part_file(document, part)?;
                Ok((document.clone(), Some(part.to_owned()), file))
            }
        }
    }
}

/// Files at a cabinet tip following the document naming convention.
fn document_pattern() -> Result<glob::Pattern, EngineError> {
    glob::Pattern::new("doc_*").map_err(|e| EngineError::InvalidOperation {
        detail: format!("document file pattern failed to compile: {e}"),
    })
}

// ---------------------------------------------------------------------------
// Branch creation
// ---------------------------------------------------------------------------

/// Create a personal branch off the shared line. Idempotent.
///
/// The branch becomes visible only through the automatic initial commit;
/// any failure while staging leaves no branch behind. The working tree is
/// restored to the shared tip before returning.
fn create_branch<S: VersionStore>(
    repo: &Repository<S>,
    branch: &bindery_store::BranchName,
    document: &DocumentId,
) -> Result<(), EngineError> {
    let body = ident::body_file(document)?;
    repo.transaction(|txn| {
        if txn.store_ref().branch_exists(branch) {
            debug!(%branch, "personal branch already exists");
            return Ok(());
        }
        let main_tip = txn.store_ref().branch_tip(repo.main_branch())?;
        let store = txn.store();
        store.checkout(&main_tip)?;
        store.set_active_branch(branch)?;

        // Bootstrap the document when the shared line does not have it yet.
        if !store.file_exists(&body) {
            store.write_file(&body, b"")?;
            store.add_file(&body)?;
        }

        // Isolation: drop everything the bound document does not own.
        let garbage: Vec<FileId> = store
            .list_tracked_files()
            .into_iter()
            .filter(|id| !ident::file_belongs_to(id, document))
            .collect();
        store.remove_files(&garbage)?;

        store.commit(
            &format!("[AUTO] Initial commit for branch '{branch}'."),
            repo.system_author(),
        )?;

        // Leave the shared tip checked out for the next caller.
        store.checkout(&main_tip)?;
        info!(%branch, document = %document, "personal branch created");
        Ok(())
    })
}
