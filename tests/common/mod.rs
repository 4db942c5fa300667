//! Shared test helpers for bindery integration tests.
//!
//! All tests use temp directories — no side effects outside the test.
//! Each test gets its own repository via `TestRepo::new()`.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bindery::{Document, DocumentId, Repository, UserId};
use bindery_store::{
    BranchName, FileId, FsStore, MergeOutcome, RevisionId, StoreError, VersionStore,
};
use tempfile::TempDir;

/// A fresh repository in a temp directory.
pub struct TestRepo {
    dir: TempDir,
    pub repo: Repository<FsStore>,
}

impl TestRepo {
    /// Create an empty repository.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let repo = Repository::create(dir.path()).expect("failed to create repository");
        Self { dir, repo }
    }

    /// The repository location on disk.
    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// Create a document on the shared line with the given content.
    pub fn seed_main(&self, doc: &str, content: &str) {
        self.repo
            .main_cabinet()
            .create(Some(doc), content.as_bytes())
            .expect("failed to seed main document");
    }

    /// The current shared-line content of a document.
    pub fn main_content(&self, doc: &str) -> String {
        let content = self
            .repo
            .main_cabinet()
            .retrieve(Some(doc))
            .expect("document missing from the shared line")
            .read()
            .expect("failed to read shared document");
        String::from_utf8(content).expect("shared content is not UTF-8")
    }

    /// The personal document handle for (doc, user), creating the cabinet
    /// on first use.
    pub fn personal(&self, doc: &str, user: &str) -> Document<'_, FsStore> {
        let document = doc_id(doc);
        let user = user_id(user);
        self.repo
            .cabinet(&document, &user, true)
            .expect("failed to open personal cabinet")
            .document()
            .expect("failed to open personal document")
    }

    /// Write and commit content in a user's personal cabinet.
    pub fn edit_personal(&self, doc: &str, user: &str, content: &str, message: &str) {
        let mut handle = self.personal(doc, user);
        handle.write(content.as_bytes().to_vec());
        handle
            .commit(message, user)
            .expect("failed to commit personal edit");
    }
}

/// A store that fails staging writes on command, for exercising abort
/// paths through `Repository::with_store`.
#[derive(Debug)]
pub struct FlakyStore {
    inner: FsStore,
    fail_staging: Arc<AtomicBool>,
}

impl FlakyStore {
    /// Wrap `inner`; the returned flag arms staging failures.
    pub fn new(inner: FsStore) -> (Self, Arc<AtomicBool>) {
        let fail_staging = Arc::new(AtomicBool::new(false));
        let store = Self {
            inner,
            fail_staging: Arc::clone(&fail_staging),
        };
        (store, fail_staging)
    }

    fn staging_gate(&self) -> Result<(), StoreError> {
        if self.fail_staging.load(Ordering::Relaxed) {
            return Err(StoreError::Io(std::io::Error::other(
                "injected staging failure",
            )));
        }
        Ok(())
    }
}

impl VersionStore for FlakyStore {
    fn checkout(&mut self, rev: &RevisionId) -> Result<(), StoreError> {
        self.inner.checkout(rev)
    }
    fn merge(&mut self, rev: &RevisionId) -> Result<MergeOutcome, StoreError> {
        self.inner.merge(rev)
    }
    fn commit(&mut self, message: &str, author: &str) -> Result<RevisionId, StoreError> {
        self.inner.commit(message, author)
    }
    fn active_branch(&self) -> &BranchName {
        self.inner.active_branch()
    }
    fn set_active_branch(&mut self, name: &BranchName) -> Result<(), StoreError> {
        self.inner.set_active_branch(name)
    }
    fn working_revision(&self) -> Option<RevisionId> {
        self.inner.working_revision()
    }
    fn branch_tip(&self, name: &BranchName) -> Result<RevisionId, StoreError> {
        self.inner.branch_tip(name)
    }
    fn branch_exists(&self, name: &BranchName) -> bool {
        self.inner.branch_exists(name)
    }
    fn file_exists(&self, id: &FileId) -> bool {
        self.inner.file_exists(id)
    }
    fn add_file(&mut self, id: &FileId) -> Result<(), StoreError> {
        self.inner.add_file(id)
    }
    fn remove_files(&mut self, ids: &[FileId]) -> Result<(), StoreError> {
        self.staging_gate()?;
        self.inner.remove_files(ids)
    }
    fn read_file(&self, id: &FileId) -> Result<Vec<u8>, StoreError> {
        self.inner.read_file(id)
    }
    fn write_file(&mut self, id: &FileId, data: &[u8]) -> Result<(), StoreError> {
        self.staging_gate()?;
        self.inner.write_file(id, data)
    }
    fn file_size(&self, id: &FileId) -> Result<u64, StoreError> {
        self.inner.file_size(id)
    }
    fn list_tracked_files(&self) -> Vec<FileId> {
        self.inner.list_tracked_files()
    }
    fn tracked_files_at(&self, rev: &RevisionId) -> Result<Vec<FileId>, StoreError> {
        self.inner.tracked_files_at(rev)
    }
    fn read_file_at(&self, rev: &RevisionId, id: &FileId) -> Result<Vec<u8>, StoreError> {
        self.inner.read_file_at(rev, id)
    }
    fn common_ancestor(
        &self,
        a: &RevisionId,
        b: &RevisionId,
    ) -> Result<Option<RevisionId>, StoreError> {
        self.inner.common_ancestor(a, b)
    }
    fn is_ancestor(&self, a: &RevisionId, b: &RevisionId) -> Result<bool, StoreError> {
        self.inner.is_ancestor(a, b)
    }
    fn parents(&self, rev: &RevisionId) -> Result<Vec<RevisionId>, StoreError> {
        self.inner.parents(rev)
    }
    fn branch_of(&self, rev: &RevisionId) -> Result<BranchName, StoreError> {
        self.inner.branch_of(rev)
    }
}

pub fn doc_id(s: &str) -> DocumentId {
    DocumentId::new(s).expect("invalid document id in test")
}

pub fn user_id(s: &str) -> UserId {
    UserId::new(s).expect("invalid user id in test")
}
