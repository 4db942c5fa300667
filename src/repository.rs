//! Repository: the root handle and the exclusive-transaction path.
//!
//! A [`Repository`] owns the version store behind a mutex. Every engine
//! operation runs inside [`Repository::transaction`], the single lock path:
//! it blocks until the store is free, hands the closure a [`Txn`] scope
//! object, and releases on every exit path. Re-entering from the same
//! thread fails fast with [`EngineError::ReentrantTransaction`] instead of
//! deadlocking.

use std::cell::RefCell;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bindery_store::{BranchName, FsStore, VersionStore};
use tracing::{debug, warn};

use crate::cabinet::Cabinet;
use crate::config::{BinderyConfig, CONFIG_FILE};
use crate::document::Document;
use crate::error::EngineError;
use crate::model::{DocumentId, UserId};

thread_local! {
    /// Repositories with a transaction active on this thread.
    static ACTIVE: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// The root handle to a document repository.
#[derive(Debug)]
pub struct Repository<S: VersionStore> {
    store: Mutex<S>,
    main_branch: BranchName,
    system_author: String,
}

impl Repository<FsStore> {
    /// Initialize a new repository at `location`.
    ///
    /// Reads `bindery.toml` at the location (defaults when absent), creates
    /// the store, and makes the bootstrap commit on the main branch.
    ///
    /// # Errors
    /// Fails with [`EngineError::RepositoryExists`] when the location
    /// already holds a repository, or [`EngineError::CreateFailed`] when
    /// initialization does not complete. A failed create removes the
    /// partial store state, so the same location can be retried.
    pub fn create(location: &Path) -> Result<Self, EngineError> {
        let config = BinderyConfig::load(&location.join(CONFIG_FILE))?;
        let main_branch = parse_main_branch(&config)?;
        let store = FsStore::create(location, main_branch.clone()).map_err(|e| match e {
            bindery_store::StoreError::StoreExists { path } => {
                EngineError::RepositoryExists { path }
            }
            other => EngineError::CreateFailed {
                path: location.to_owned(),
                detail: other.to_string(),
            },
        })?;
        let repo = Self::finish_create(store, location, main_branch, config.repo.system_author);
        if repo.is_err() {
            // A half-initialized store would make the next create fail
            // with RepositoryExists and open with a missing main branch.
            if let Err(e) = FsStore::destroy(location) {
                warn!(location = %location.display(), error = %e, "cleanup after aborted create failed");
            }
        } else {
            debug!(location = %location.display(), branch = %config.repo.main_branch, "repository created");
        }
        repo
    }

    /// Open the repository at `location`.
    ///
    /// # Errors
    /// Fails with [`EngineError::NotARepository`] when no repository is
    /// present, or [`EngineError::InvalidOperation`] when the store exists
    /// but lacks the configured main branch.
    pub fn open(location: &Path) -> Result<Self, EngineError> {
        let config = BinderyConfig::load(&location.join(CONFIG_FILE))?;
        let main_branch = parse_main_branch(&config)?;
        let store = FsStore::open(location)?;
        if !store.branch_exists(&main_branch) {
            return Err(EngineError::InvalidOperation {
                detail: format!(
                    "the store at '{}' has no '{main_branch}' branch; it was not initialized as a repository",
                    location.display()
                ),
            });
        }
        Ok(Self::assemble(store, main_branch, config.repo.system_author))
    }
}

impl<S: VersionStore> Repository<S> {
    /// Wrap an already-constructed store, bootstrapping the main branch
    /// when it does not exist yet. Intended for alternate backends and
    /// in-memory test stores.
    ///
    /// # Errors
    /// Fails when the configured main branch name is invalid or the
    /// bootstrap commit cannot be made.
    pub fn with_store(store: S, config: BinderyConfig) -> Result<Self, EngineError> {
        let main_branch = parse_main_branch(&config)?;
        if store.branch_exists(&main_branch) {
            Ok(Self::assemble(store, main_branch, config.repo.system_author))
        } else {
            Self::bootstrap(store, main_branch, config.repo.system_author)
        }
    }

    /// Bootstrap a freshly created store, reporting any failure as
    /// [`EngineError::CreateFailed`] for `location`.
    fn finish_create(
        store: S,
        location: &Path,
        main_branch: BranchName,
        system_author: String,
    ) -> Result<Self, EngineError> {
        Self::bootstrap(store, main_branch, system_author).map_err(|e| {
            EngineError::CreateFailed {
                path: location.to_owned(),
                detail: e.to_string(),
            }
        })
    }

    fn bootstrap(
        mut store: S,
        main_branch: BranchName,
        system_author: String,
    ) -> Result<Self, EngineError> {
        store.set_active_branch(&main_branch)?;
        store.commit("[AUTO] Repository created.", &system_author)?;
        Ok(Self::assemble(store, main_branch, system_author))
    }

    fn assemble(store: S, main_branch: BranchName, system_author: String) -> Self {
        Self {
            store: Mutex::new(store),
            main_branch,
            system_author,
        }
    }

    /// The shared (main) branch name.
    #[must_use]
    pub fn main_branch(&self) -> &BranchName {
        &self.main_branch
    }

    /// The author recorded on automatic commits.
    #[must_use]
    pub fn system_author(&self) -> &str {
        &self.system_author
    }

    // -- cabinets and documents --

    /// The Main Cabinet — the shared line every document is published to.
    #[must_use]
    pub fn main_cabinet(&self) -> Cabinet<'_, S> {
        Cabinet::main(self)
    }

    /// The personal cabinet binding `user` to `document`.
    ///
    /// With `create` set, the personal branch is created when absent
    /// (idempotent); without it, a missing branch is an error.
    ///
    /// # Errors
    /// Fails with [`EngineError::CabinetNotFound`] when the cabinet does
    /// not exist and `create` is false.
    pub fn cabinet(
        &self,
        document: &DocumentId,
        user: &UserId,
        create: bool,
    ) -> Result<Cabinet<'_, S>, EngineError> {
        Cabinet::personal(self, document.clone(), user.clone(), create)
    }

    /// Convenience: the document handle for an existing personal cabinet.
    ///
    /// # Errors
    /// Fails with [`EngineError::CabinetNotFound`] when `user` has no
    /// cabinet for `document`.
    pub fn document(
        &self,
        document: &DocumentId,
        user: &UserId,
    ) -> Result<Document<'_, S>, EngineError> {
        self.cabinet(document, user, false)?.document()
    }

    // -- the lock path --

    /// Run `f` with exclusive access to the store.
    ///
    /// Blocks until the store is available. Calling this while a
    /// transaction is already active on the same repository from the same
    /// thread fails with [`EngineError::ReentrantTransaction`] — engine
    /// operations open their own transactions, so they must not be invoked
    /// from inside one.
    ///
    /// # Errors
    /// [`EngineError::ReentrantTransaction`] on same-thread nesting;
    /// otherwise whatever `f` returns.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&mut Txn<'_, S>) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let token = std::ptr::from_ref(self) as usize;
        let entered = ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&token) {
                false
            } else {
                active.push(token);
                true
            }
        });
        if !entered {
            return Err(EngineError::ReentrantTransaction);
        }
        let _guard = ActiveGuard { token };

        let store = self
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        debug!("transaction begin");
        let mut txn = Txn { store };
        let result = f(&mut txn);
        debug!(ok = result.is_ok(), "transaction end");
        result
    }
}

fn parse_main_branch(config: &BinderyConfig) -> Result<BranchName, EngineError> {
    BranchName::new(&config.repo.main_branch).map_err(|e| EngineError::Config {
        path: CONFIG_FILE.into(),
        detail: format!("invalid main branch name: {e}"),
    })
}

/// Removes this thread's active-transaction marker at scope exit.
struct ActiveGuard {
    token: usize,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().position(|&t| t == self.token) {
                active.swap_remove(pos);
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Txn
// ---------------------------------------------------------------------------

/// Exclusive access to the store for the duration of one transaction.
pub struct Txn<'a, S: VersionStore> {
    store: MutexGuard<'a, S>,
}

impl<S: VersionStore> Txn<'_, S> {
    /// Direct store access.
    pub(crate) fn store(&mut self) -> &mut S {
        &mut self.store
    }

    /// Read-only store access.
    pub(crate) fn store_ref(&self) -> &S {
        &self.store
    }

    /// Run `f` with `branch`'s tip checked out, then restore the previous
    /// checkout. This is the only path on which the active branch changes.
    pub(crate) fn in_branch<T>(
        &mut self,
        branch: &BranchName,
        f: impl FnOnce(&mut S) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let previous = self.store.working_revision();
        let tip = self.store.branch_tip(branch)?;
        self.store.checkout(&tip)?;
        let result = f(&mut self.store);
        let restore = match previous {
            Some(rev) => self.store.checkout(&rev).map_err(EngineError::from),
            None => Ok(()),
        };
        match (result, restore) {
            (Err(e), _) | (Ok(_), Err(e)) => Err(e),
            (Ok(value), Ok(())) => Ok(value),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_store::{FileId, MergeOutcome, RevisionId, StoreError};
    use tempfile::TempDir;

    /// A store whose bootstrap commit always fails.
    #[derive(Debug)]
    struct BrokenCommitStore {
        branch: BranchName,
    }

    impl VersionStore for BrokenCommitStore {
        fn checkout(&mut self, _rev: &RevisionId) -> Result<(), StoreError> {
            unreachable!()
        }
        fn merge(&mut self, _rev: &RevisionId) -> Result<MergeOutcome, StoreError> {
            unreachable!()
        }
        fn commit(&mut self, _message: &str, _author: &str) -> Result<RevisionId, StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
        fn active_branch(&self) -> &BranchName {
            &self.branch
        }
        fn set_active_branch(&mut self, name: &BranchName) -> Result<(), StoreError> {
            self.branch = name.clone();
            Ok(())
        }
        fn working_revision(&self) -> Option<RevisionId> {
            None
        }
        fn branch_tip(&self, name: &BranchName) -> Result<RevisionId, StoreError> {
            Err(StoreError::UnknownBranch { name: name.clone() })
        }
        fn branch_exists(&self, _name: &BranchName) -> bool {
            false
        }
        fn file_exists(&self, _id: &FileId) -> bool {
            false
        }
        fn add_file(&mut self, _id: &FileId) -> Result<(), StoreError> {
            unreachable!()
        }
        fn remove_files(&mut self, _ids: &[FileId]) -> Result<(), StoreError> {
            unreachable!()
        }
        fn read_file(&self, _id: &FileId) -> Result<Vec<u8>, StoreError> {
            unreachable!()
        }
        fn write_file(&mut self, _id: &FileId, _data: &[u8]) -> Result<(), StoreError> {
            unreachable!()
        }
        fn file_size(&self, _id: &FileId) -> Result<u64, StoreError> {
            unreachable!()
        }
        fn list_tracked_files(&self) -> Vec<FileId> {
            Vec::new()
        }
        fn tracked_files_at(&self, _rev: &RevisionId) -> Result<Vec<FileId>, StoreError> {
            unreachable!()
        }
        fn read_file_at(
            &self,
            _rev: &RevisionId,
            _id: &FileId,
        ) -> Result<Vec<u8>, StoreError> {
            unreachable!()
        }
        fn common_ancestor(
            &self,
            _a: &RevisionId,
            _b: &RevisionId,
        ) -> Result<Option<RevisionId>, StoreError> {
            unreachable!()
        }
        fn is_ancestor(&self, _a: &RevisionId, _b: &RevisionId) -> Result<bool, StoreError> {
            unreachable!()
        }
        fn parents(&self, _rev: &RevisionId) -> Result<Vec<RevisionId>, StoreError> {
            unreachable!()
        }
        fn branch_of(&self, _rev: &RevisionId) -> Result<BranchName, StoreError> {
            unreachable!()
        }
    }

    fn repo() -> (TempDir, Repository<FsStore>) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::create(dir.path()).unwrap();
        (dir, repo)
    }

    #[test]
    fn create_then_open() {
        let (dir, repo) = repo();
        assert_eq!(repo.main_branch().as_str(), "default");
        drop(repo);
        let reopened = Repository::open(dir.path()).unwrap();
        assert_eq!(reopened.main_branch().as_str(), "default");
    }

    #[test]
    fn create_twice_fails() {
        let (dir, _repo) = repo();
        let err = Repository::create(dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::RepositoryExists { .. }));
    }

    #[test]
    fn bootstrap_failure_maps_to_create_failed() {
        let store = BrokenCommitStore {
            branch: BranchName::new("default").unwrap(),
        };
        let err = Repository::finish_create(
            store,
            Path::new("/nowhere"),
            BranchName::new("default").unwrap(),
            "library".into(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::CreateFailed { .. }));
    }

    #[test]
    #[cfg(unix)]
    fn failed_create_leaves_location_retryable() {
        let dir = TempDir::new().unwrap();
        // A dangling symlink where the store directory would go makes
        // store creation fail partway through.
        std::os::unix::fs::symlink(dir.path().join("missing"), dir.path().join(".bindery"))
            .unwrap();
        let err = Repository::create(dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::CreateFailed { .. }));

        std::fs::remove_file(dir.path().join(".bindery")).unwrap();
        assert!(Repository::create(dir.path()).is_ok());
    }

    #[test]
    fn open_missing_fails() {
        let dir = TempDir::new().unwrap();
        let err = Repository::open(dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::NotARepository { .. }));
    }

    #[test]
    fn config_overrides_main_branch() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[repo]\nmain_branch = \"trunk\"\n")
            .unwrap();
        let repo = Repository::create(dir.path()).unwrap();
        assert_eq!(repo.main_branch().as_str(), "trunk");
    }

    #[test]
    fn transaction_runs_closure() {
        let (_dir, repo) = repo();
        let branch = repo
            .transaction(|txn| Ok(txn.store_ref().active_branch().clone()))
            .unwrap();
        assert_eq!(branch.as_str(), "default");
    }

    #[test]
    fn nested_transaction_fails() {
        let (_dir, repo) = repo();
        let err = repo
            .transaction(|_| repo.transaction(|_| Ok(())))
            .unwrap_err();
        assert!(matches!(err, EngineError::ReentrantTransaction));
    }

    #[test]
    fn transaction_reusable_after_nesting_error() {
        let (_dir, repo) = repo();
        let _ = repo.transaction(|_| repo.transaction(|_| Ok(())));
        assert!(repo.transaction(|_| Ok(())).is_ok());
    }

    #[test]
    fn distinct_repositories_can_nest() {
        let (_d1, repo1) = repo();
        let (_d2, repo2) = repo();
        let result = repo1.transaction(|_| repo2.transaction(|_| Ok(42)));
        assert_eq!(result.unwrap(), 42);
    }
}
