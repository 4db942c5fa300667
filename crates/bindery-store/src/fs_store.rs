//! `FsStore` — the file-backed changeset store.
//!
//! Layout under `<location>/.bindery/`:
//!
//! - `graph.json` — every changeset (parents, branch, message, author, file
//!   snapshot) plus branch tips and a generation counter.
//! - `state.json` — working-tree state: parent revision(s), branch label,
//!   tracked file set.
//! - `blobs/<sha256>` — content-addressed file contents.
//!
//! Working files are materialized directly at `<location>/<file_id>`.
//!
//! Revision ids are the SHA-256 of the changeset's canonical JSON encoding,
//! so identical snapshots on identical parents hash identically and the
//! graph is tamper-evident. Branch tips only move inside
//! [`commit`](VersionStore::commit); an aborted multi-step operation leaves
//! no new branch visible.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::StoreError;
use crate::merge3::{MergeResult, merge_file};
use crate::store::VersionStore;
use crate::types::{BranchName, FileId, MergeOutcome, RevisionId};

const STORE_DIR: &str = ".bindery";
const GRAPH_FILE: &str = "graph.json";
const STATE_FILE: &str = "state.json";
const BLOBS_DIR: &str = "blobs";

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// One immutable node of the changeset graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Changeset {
    parents: Vec<RevisionId>,
    branch: BranchName,
    message: String,
    author: String,
    /// Snapshot: file id → blob digest (lowercase hex).
    files: BTreeMap<FileId, String>,
    /// Monotonic commit counter; also a cheap topological hint.
    generation: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Graph {
    changesets: BTreeMap<RevisionId, Changeset>,
    branches: BTreeMap<BranchName, RevisionId>,
    generation: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct WorkingState {
    /// Revision the working tree is based on.
    parent: Option<RevisionId>,
    /// Second parent recorded by an in-progress merge.
    merge_parent: Option<RevisionId>,
    /// Branch the next commit will extend.
    branch: BranchName,
    /// Files tracked in the working tree.
    tracked: BTreeSet<FileId>,
}

// ---------------------------------------------------------------------------
// FsStore
// ---------------------------------------------------------------------------

/// File-backed [`VersionStore`] implementation.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    store_dir: PathBuf,
    graph: Graph,
    state: WorkingState,
}

impl FsStore {
    /// Initialize a new, empty store at `root`.
    ///
    /// The initial branch label is `initial_branch`; the caller is expected
    /// to make the first commit before resolving any branch tip.
    ///
    /// # Errors
    /// Fails with [`StoreError::StoreExists`] if `root` already holds a
    /// store, or with an I/O error if the directories cannot be created.
    pub fn create(root: &Path, initial_branch: BranchName) -> Result<Self, StoreError> {
        let store_dir = root.join(STORE_DIR);
        if store_dir.exists() {
            return Err(StoreError::StoreExists {
                path: root.to_owned(),
            });
        }
        fs::create_dir_all(store_dir.join(BLOBS_DIR))?;

        let store = Self {
            root: root.to_owned(),
            store_dir,
            graph: Graph::default(),
            state: WorkingState {
                parent: None,
                merge_parent: None,
                branch: initial_branch,
                tracked: BTreeSet::new(),
            },
        };
        store.persist_graph()?;
        store.persist_state()?;
        debug!(root = %root.display(), "store created");
        Ok(store)
    }

    /// Attach to an existing store at `root`.
    ///
    /// # Errors
    /// Fails with [`StoreError::NotAStore`] if no store is present, or
    /// [`StoreError::Corrupt`] if the persisted state cannot be decoded.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        let store_dir = root.join(STORE_DIR);
        if !store_dir.is_dir() {
            return Err(StoreError::NotAStore {
                path: root.to_owned(),
                reason: format!("missing {STORE_DIR} directory"),
            });
        }
        let graph = read_json(&store_dir.join(GRAPH_FILE))?;
        let state = read_json(&store_dir.join(STATE_FILE))?;
        Ok(Self {
            root: root.to_owned(),
            store_dir,
            graph,
            state,
        })
    }

    /// The store's root location.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove the store state at `root`, leaving other files in place.
    ///
    /// Missing state is not an error, so an aborted initialization can
    /// always be cleaned up and the location reused.
    ///
    /// # Errors
    /// Fails on I/O errors other than the state being absent.
    pub fn destroy(root: &Path) -> Result<(), StoreError> {
        match fs::remove_dir_all(root.join(STORE_DIR)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    // -- persistence --

    fn persist_graph(&self) -> Result<(), StoreError> {
        write_json_atomic(&self.store_dir.join(GRAPH_FILE), &self.graph)
    }

    fn persist_state(&self) -> Result<(), StoreError> {
        write_json_atomic(&self.store_dir.join(STATE_FILE), &self.state)
    }

    // -- blobs --

    fn blob_path(&self, digest: &str) -> PathBuf {
        self.store_dir.join(BLOBS_DIR).join(digest)
    }

    fn write_blob(&self, data: &[u8]) -> Result<String, StoreError> {
        let digest = hex_digest(data);
        let path = self.blob_path(&digest);
        if !path.exists() {
            fs::write(&path, data)?;
        }
        Ok(digest)
    }

    fn read_blob(&self, digest: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.blob_path(digest);
        fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::Corrupt {
                    path,
                    detail: "blob referenced by a changeset is missing".to_owned(),
                }
            } else {
                StoreError::Io(e)
            }
        })
    }

    // -- graph helpers --

    fn changeset(&self, rev: &RevisionId) -> Result<&Changeset, StoreError> {
        self.graph
            .changesets
            .get(rev)
            .ok_or(StoreError::UnknownRevision { id: *rev })
    }

    /// All ancestors of `rev`, including `rev` itself.
    fn ancestors(&self, rev: &RevisionId) -> Result<HashSet<RevisionId>, StoreError> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([*rev]);
        while let Some(cur) = queue.pop_front() {
            if !seen.insert(cur) {
                continue;
            }
            for parent in &self.changeset(&cur)?.parents {
                queue.push_back(*parent);
            }
        }
        Ok(seen)
    }

    fn working_file_path(&self, id: &FileId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Snapshot of a revision's files: file id → blob digest.
    fn snapshot(&self, rev: &RevisionId) -> Result<&BTreeMap<FileId, String>, StoreError> {
        Ok(&self.changeset(rev)?.files)
    }

    /// Capture the working tree as a snapshot map, writing blobs as needed.
    fn capture_working_tree(&self) -> Result<BTreeMap<FileId, String>, StoreError> {
        let mut files = BTreeMap::new();
        for id in &self.state.tracked {
            let data = fs::read(self.working_file_path(id))?;
            files.insert(id.clone(), self.write_blob(&data)?);
        }
        Ok(files)
    }

    /// Materialize a snapshot into the working tree, replacing whatever is
    /// there.
    fn materialize(&mut self, files: &BTreeMap<FileId, String>) -> Result<(), StoreError> {
        // Drop files that are tracked now but absent from the target.
        let stale: Vec<FileId> = self
            .state
            .tracked
            .iter()
            .filter(|id| !files.contains_key(*id))
            .cloned()
            .collect();
        for id in &stale {
            remove_if_present(&self.working_file_path(id))?;
        }
        for (id, digest) in files {
            let data = self.read_blob(digest)?;
            fs::write(self.working_file_path(id), data)?;
        }
        self.state.tracked = files.keys().cloned().collect();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// VersionStore impl
// ---------------------------------------------------------------------------

impl VersionStore for FsStore {
    fn checkout(&mut self, rev: &RevisionId) -> Result<(), StoreError> {
        let (files, branch) = {
            let cs = self.changeset(rev)?;
            (cs.files.clone(), cs.branch.clone())
        };
        self.materialize(&files)?;
        self.state.parent = Some(*rev);
        self.state.merge_parent = None;
        self.state.branch = branch;
        self.persist_state()?;
        debug!(rev = %rev.short(), "checkout");
        Ok(())
    }

    fn merge(&mut self, rev: &RevisionId) -> Result<MergeOutcome, StoreError> {
        let parent = self.state.parent.ok_or_else(|| StoreError::Corrupt {
            path: self.store_dir.join(STATE_FILE),
            detail: "merge requested with no working parent".to_owned(),
        })?;

        let base_rev = self.common_ancestor(&parent, rev)?;
        let empty = BTreeMap::new();
        let base_files = match base_rev {
            Some(ref b) => self.snapshot(b)?.clone(),
            None => empty,
        };
        let their_files = self.snapshot(rev)?.clone();

        let our_label = self.state.branch.to_string();
        let their_label = self.branch_of(rev)?.to_string();

        let mut outcome = MergeOutcome::default();

        let mut ids: BTreeSet<FileId> = self.state.tracked.clone();
        ids.extend(their_files.keys().cloned());

        for id in ids {
            let path = self.working_file_path(&id);
            let ours = if self.state.tracked.contains(&id) {
                Some(fs::read(&path)?)
            } else {
                None
            };
            let base = match base_files.get(&id) {
                Some(digest) => Some(self.read_blob(digest)?),
                None => None,
            };
            let theirs = match their_files.get(&id) {
                Some(digest) => Some(self.read_blob(digest)?),
                None => None,
            };

            match (ours, theirs) {
                (Some(o), None) => {
                    if let Some(b) = base {
                        if o == b {
                            // Removed on their side, untouched here.
                            remove_if_present(&path)?;
                            self.state.tracked.remove(&id);
                            outcome.removed += 1;
                        } else {
                            // Edited here, deleted there.
                            outcome.unresolved.push(id);
                        }
                    }
                    // No base: a local addition, keep it.
                }
                (None, Some(t)) => {
                    match base {
                        // Deleted here, edited there.
                        Some(b) if t != b => {
                            fs::write(&path, &t)?;
                            self.state.tracked.insert(id.clone());
                            outcome.unresolved.push(id);
                        }
                        // Deleted here, untouched there: stays deleted.
                        Some(_) => {}
                        // Added on their side.
                        None => {
                            fs::write(&path, &t)?;
                            self.state.tracked.insert(id);
                            outcome.updated += 1;
                        }
                    }
                }
                (Some(o), Some(t)) => {
                    if o == t {
                        continue;
                    }
                    let b = base.unwrap_or_default();
                    if o == b {
                        fs::write(&path, &t)?;
                        outcome.updated += 1;
                        continue;
                    }
                    if t == b {
                        continue;
                    }
                    match merge_file(&b, &o, &t, &our_label, &their_label) {
                        MergeResult::Clean(content) => {
                            fs::write(&path, content)?;
                            outcome.merged += 1;
                        }
                        MergeResult::Conflicted { content, .. } => {
                            fs::write(&path, content)?;
                            outcome.unresolved.push(id);
                        }
                    }
                }
                (None, None) => {}
            }
        }

        self.state.merge_parent = Some(*rev);
        self.persist_state()?;
        debug!(
            rev = %rev.short(),
            updated = outcome.updated,
            merged = outcome.merged,
            removed = outcome.removed,
            unresolved = outcome.unresolved.len(),
            "merge into working tree"
        );
        Ok(outcome)
    }

    fn commit(&mut self, message: &str, author: &str) -> Result<RevisionId, StoreError> {
        let files = self.capture_working_tree()?;

        let mut parents = Vec::new();
        if let Some(p) = self.state.parent {
            parents.push(p);
        }
        if let Some(mp) = self.state.merge_parent {
            parents.push(mp);
        }

        if let [parent] = parents.as_slice() {
            let parent_cs = self.changeset(parent)?;
            // A commit that opens a new branch is allowed even with an
            // unchanged snapshot.
            if parent_cs.branch == self.state.branch && parent_cs.files == files {
                return Err(StoreError::NothingToCommit {
                    branch: self.state.branch.clone(),
                });
            }
        }

        let changeset = Changeset {
            parents,
            branch: self.state.branch.clone(),
            message: message.to_owned(),
            author: author.to_owned(),
            files,
            generation: self.graph.generation + 1,
        };
        let rev = changeset_id(&changeset)?;

        self.graph.generation += 1;
        self.graph
            .branches
            .insert(changeset.branch.clone(), rev);
        self.graph.changesets.insert(rev, changeset);
        self.persist_graph()?;

        self.state.parent = Some(rev);
        self.state.merge_parent = None;
        self.persist_state()?;

        debug!(rev = %rev.short(), branch = %self.state.branch, "commit");
        Ok(rev)
    }

    fn active_branch(&self) -> &BranchName {
        &self.state.branch
    }

    fn set_active_branch(&mut self, name: &BranchName) -> Result<(), StoreError> {
        self.state.branch = name.clone();
        self.persist_state()
    }

    fn working_revision(&self) -> Option<RevisionId> {
        self.state.parent
    }

    fn branch_tip(&self, name: &BranchName) -> Result<RevisionId, StoreError> {
        self.graph
            .branches
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::UnknownBranch { name: name.clone() })
    }

    fn branch_exists(&self, name: &BranchName) -> bool {
        self.graph.branches.contains_key(name)
    }

    fn file_exists(&self, id: &FileId) -> bool {
        self.state.tracked.contains(id)
    }

    fn add_file(&mut self, id: &FileId) -> Result<(), StoreError> {
        if !self.working_file_path(id).is_file() {
            return Err(StoreError::FileNotTracked { id: id.clone() });
        }
        self.state.tracked.insert(id.clone());
        self.persist_state()
    }

    fn remove_files(&mut self, ids: &[FileId]) -> Result<(), StoreError> {
        for id in ids {
            if self.state.tracked.remove(id) {
                remove_if_present(&self.working_file_path(id))?;
            }
        }
        self.persist_state()
    }

    fn read_file(&self, id: &FileId) -> Result<Vec<u8>, StoreError> {
        if !self.state.tracked.contains(id) {
            return Err(StoreError::FileNotTracked { id: id.clone() });
        }
        Ok(fs::read(self.working_file_path(id))?)
    }

    fn write_file(&mut self, id: &FileId, data: &[u8]) -> Result<(), StoreError> {
        fs::write(self.working_file_path(id), data)?;
        Ok(())
    }

    fn file_size(&self, id: &FileId) -> Result<u64, StoreError> {
        if !self.state.tracked.contains(id) {
            return Err(StoreError::FileNotTracked { id: id.clone() });
        }
        Ok(fs::metadata(self.working_file_path(id))?.len())
    }

    fn list_tracked_files(&self) -> Vec<FileId> {
        self.state.tracked.iter().cloned().collect()
    }

    fn tracked_files_at(&self, rev: &RevisionId) -> Result<Vec<FileId>, StoreError> {
        Ok(self.snapshot(rev)?.keys().cloned().collect())
    }

    fn read_file_at(&self, rev: &RevisionId, id: &FileId) -> Result<Vec<u8>, StoreError> {
        let digest = self
            .snapshot(rev)?
            .get(id)
            .ok_or_else(|| StoreError::FileNotTracked { id: id.clone() })?
            .clone();
        self.read_blob(&digest)
    }

    fn common_ancestor(
        &self,
        a: &RevisionId,
        b: &RevisionId,
    ) -> Result<Option<RevisionId>, StoreError> {
        let anc_a = self.ancestors(a)?;
        let anc_b = self.ancestors(b)?;
        let best = anc_a
            .intersection(&anc_b)
            .map(|rev| {
                let generation = self.changeset(rev).map(|cs| cs.generation)?;
                Ok::<_, StoreError>((generation, *rev))
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .max();
        Ok(best.map(|(_, rev)| rev))
    }

    fn is_ancestor(&self, a: &RevisionId, b: &RevisionId) -> Result<bool, StoreError> {
        if a == b {
            return Ok(false);
        }
        // Existence check up front so an unknown `a` is an error, not `false`.
        self.changeset(a)?;
        Ok(self.ancestors(b)?.contains(a))
    }

    fn parents(&self, rev: &RevisionId) -> Result<Vec<RevisionId>, StoreError> {
        Ok(self.changeset(rev)?.parents.clone())
    }

    fn branch_of(&self, rev: &RevisionId) -> Result<BranchName, StoreError> {
        Ok(self.changeset(rev)?.branch.clone())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn hex_digest(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn changeset_id(changeset: &Changeset) -> Result<RevisionId, StoreError> {
    let encoded = serde_json::to_vec(changeset).map_err(|e| StoreError::Corrupt {
        path: PathBuf::from(GRAPH_FILE),
        detail: format!("changeset not encodable: {e}"),
    })?;
    let digest = Sha256::digest(&encoded);
    Ok(RevisionId::from_bytes(digest.into()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let data = fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotAStore {
                path: path.to_owned(),
                reason: format!("missing {}", path.display()),
            }
        } else {
            StoreError::Io(e)
        }
    })?;
    serde_json::from_slice(&data).map_err(|e| StoreError::Corrupt {
        path: path.to_owned(),
        detail: e.to_string(),
    })
}

/// Write JSON via a sibling temp file and rename, so readers never observe a
/// torn file.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let data = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Corrupt {
        path: path.to_owned(),
        detail: format!("state not encodable: {e}"),
    })?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::Io(e)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    fn file(id: &str) -> FileId {
        FileId::new(id).unwrap()
    }

    fn fresh() -> (TempDir, FsStore) {
        let dir = TempDir::new().expect("temp dir");
        let store = FsStore::create(dir.path(), branch("default")).expect("create store");
        (dir, store)
    }

    /// Fresh store with a root commit containing `doc_a` = "v1\n".
    fn seeded() -> (TempDir, FsStore) {
        let (dir, mut store) = fresh();
        store.write_file(&file("doc_a"), b"v1\n").unwrap();
        store.add_file(&file("doc_a")).unwrap();
        store.commit("initial", "tests").unwrap();
        (dir, store)
    }

    // -- lifecycle --

    #[test]
    fn create_then_open_roundtrips() {
        let (dir, mut store) = fresh();
        store.write_file(&file("doc_x"), b"hello").unwrap();
        store.add_file(&file("doc_x")).unwrap();
        let rev = store.commit("first", "tests").unwrap();
        drop(store);

        let reopened = FsStore::open(dir.path()).unwrap();
        assert_eq!(reopened.branch_tip(&branch("default")).unwrap(), rev);
        assert_eq!(reopened.read_file(&file("doc_x")).unwrap(), b"hello");
    }

    #[test]
    fn create_twice_fails() {
        let (dir, _store) = fresh();
        let err = FsStore::create(dir.path(), branch("default")).unwrap_err();
        assert!(matches!(err, StoreError::StoreExists { .. }));
    }

    #[test]
    fn open_missing_fails() {
        let dir = TempDir::new().unwrap();
        let err = FsStore::open(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::NotAStore { .. }));
    }

    #[test]
    fn destroy_allows_recreation() {
        let (dir, _store) = seeded();
        FsStore::destroy(dir.path()).unwrap();
        let err = FsStore::open(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::NotAStore { .. }));
        assert!(FsStore::create(dir.path(), branch("default")).is_ok());
    }

    #[test]
    fn destroy_without_store_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        FsStore::destroy(dir.path()).unwrap();
    }

    #[test]
    fn open_corrupt_graph_fails() {
        let (dir, _store) = fresh();
        fs::write(dir.path().join(".bindery/graph.json"), b"{ not json").unwrap();
        let err = FsStore::open(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    // -- commits --

    #[test]
    fn root_commit_allowed_without_changes() {
        let (_dir, mut store) = fresh();
        let rev = store.commit("empty root", "tests").unwrap();
        assert_eq!(store.working_revision(), Some(rev));
    }

    #[test]
    fn unchanged_commit_rejected() {
        let (_dir, mut store) = seeded();
        let err = store.commit("again", "tests").unwrap_err();
        assert!(matches!(err, StoreError::NothingToCommit { .. }));
    }

    #[test]
    fn commit_advances_branch_tip() {
        let (_dir, mut store) = seeded();
        let tip1 = store.branch_tip(&branch("default")).unwrap();
        store.write_file(&file("doc_a"), b"v2\n").unwrap();
        let tip2 = store.commit("edit", "tests").unwrap();
        assert_ne!(tip1, tip2);
        assert_eq!(store.branch_tip(&branch("default")).unwrap(), tip2);
        assert_eq!(store.parents(&tip2).unwrap(), vec![tip1]);
    }

    #[test]
    fn commit_on_new_label_creates_branch() {
        let (_dir, mut store) = seeded();
        let parent = store.working_revision().unwrap();
        store.set_active_branch(&branch("side")).unwrap();
        let tip = store.commit("branch root", "tests").unwrap();
        assert!(store.branch_exists(&branch("side")));
        assert_eq!(store.branch_tip(&branch("side")).unwrap(), tip);
        assert_eq!(store.parents(&tip).unwrap(), vec![parent]);
        // Original branch tip untouched.
        assert_eq!(store.branch_tip(&branch("default")).unwrap(), parent);
    }

    // -- checkout --

    #[test]
    fn checkout_restores_snapshot_and_label() {
        let (_dir, mut store) = seeded();
        let v1 = store.working_revision().unwrap();
        store.write_file(&file("doc_a"), b"v2\n").unwrap();
        store.write_file(&file("doc_b"), b"other\n").unwrap();
        store.add_file(&file("doc_b")).unwrap();
        store.commit("second", "tests").unwrap();

        store.checkout(&v1).unwrap();
        assert_eq!(store.read_file(&file("doc_a")).unwrap(), b"v1\n");
        assert!(!store.file_exists(&file("doc_b")));
        assert_eq!(store.active_branch(), &branch("default"));
    }

    // -- ancestry --

    #[test]
    fn ancestry_linear() {
        let (_dir, mut store) = seeded();
        let a = store.working_revision().unwrap();
        store.write_file(&file("doc_a"), b"v2\n").unwrap();
        let b = store.commit("second", "tests").unwrap();

        assert!(store.is_ancestor(&a, &b).unwrap());
        assert!(!store.is_ancestor(&b, &a).unwrap());
        assert!(!store.is_ancestor(&a, &a).unwrap());
        assert_eq!(store.common_ancestor(&a, &b).unwrap(), Some(a));
    }

    #[test]
    fn ancestry_forked() {
        let (_dir, mut store) = seeded();
        let base = store.working_revision().unwrap();

        store.set_active_branch(&branch("side")).unwrap();
        store.write_file(&file("doc_a"), b"side\n").unwrap();
        let side = store.commit("side edit", "tests").unwrap();

        store.checkout(&base).unwrap();
        store.write_file(&file("doc_a"), b"main\n").unwrap();
        let main = store.commit("main edit", "tests").unwrap();

        assert!(!store.is_ancestor(&side, &main).unwrap());
        assert!(!store.is_ancestor(&main, &side).unwrap());
        assert_eq!(store.common_ancestor(&side, &main).unwrap(), Some(base));
    }

    #[test]
    fn unknown_revision_is_an_error() {
        let (_dir, store) = seeded();
        let ghost: RevisionId = "00".repeat(32).parse().unwrap();
        let here = store.working_revision().unwrap();
        assert!(matches!(
            store.is_ancestor(&ghost, &here).unwrap_err(),
            StoreError::UnknownRevision { .. }
        ));
    }

    // -- merge --

    #[test]
    fn merge_takes_their_new_file() {
        let (_dir, mut store) = seeded();
        let base = store.working_revision().unwrap();

        store.set_active_branch(&branch("side")).unwrap();
        store.write_file(&file("doc_b"), b"new\n").unwrap();
        store.add_file(&file("doc_b")).unwrap();
        let side = store.commit("add doc_b", "tests").unwrap();

        store.checkout(&base).unwrap();
        let outcome = store.merge(&side).unwrap();
        assert!(outcome.is_clean());
        assert_eq!(outcome.updated, 1);
        assert_eq!(store.read_file(&file("doc_b")).unwrap(), b"new\n");

        let merged = store.commit("merge side", "tests").unwrap();
        assert_eq!(store.parents(&merged).unwrap(), vec![base, side]);
    }

    #[test]
    fn merge_fast_forward_like_content() {
        let (_dir, mut store) = seeded();
        let base = store.working_revision().unwrap();

        store.set_active_branch(&branch("side")).unwrap();
        store.write_file(&file("doc_a"), b"v2\n").unwrap();
        let side = store.commit("edit", "tests").unwrap();

        store.checkout(&base).unwrap();
        let outcome = store.merge(&side).unwrap();
        assert!(outcome.is_clean());
        assert_eq!(store.read_file(&file("doc_a")).unwrap(), b"v2\n");
    }

    #[test]
    fn merge_conflicting_edits_reports_unresolved() {
        let (_dir, mut store) = seeded();
        let base = store.working_revision().unwrap();

        store.set_active_branch(&branch("side")).unwrap();
        store.write_file(&file("doc_a"), b"side version\n").unwrap();
        let side = store.commit("side edit", "tests").unwrap();

        store.checkout(&base).unwrap();
        store.write_file(&file("doc_a"), b"main version\n").unwrap();
        store.commit("main edit", "tests").unwrap();

        let outcome = store.merge(&side).unwrap();
        assert_eq!(outcome.unresolved, vec![file("doc_a")]);
        let content = store.read_file(&file("doc_a")).unwrap();
        let text = String::from_utf8(content).unwrap();
        assert!(text.contains("<<<<<<<"));
        assert!(text.contains("side version"));
        assert!(text.contains("main version"));
    }

    #[test]
    fn merge_disjoint_regions_clean() {
        let (_dir, mut store) = fresh();
        store
            .write_file(&file("doc_a"), b"top\nmid\nbottom\n")
            .unwrap();
        store.add_file(&file("doc_a")).unwrap();
        let base = store.commit("initial", "tests").unwrap();

        store.set_active_branch(&branch("side")).unwrap();
        store
            .write_file(&file("doc_a"), b"TOP\nmid\nbottom\n")
            .unwrap();
        let side = store.commit("edit top", "tests").unwrap();

        store.checkout(&base).unwrap();
        store
            .write_file(&file("doc_a"), b"top\nmid\nBOTTOM\n")
            .unwrap();
        store.commit("edit bottom", "tests").unwrap();

        let outcome = store.merge(&side).unwrap();
        assert!(outcome.is_clean());
        assert_eq!(outcome.merged, 1);
        assert_eq!(
            store.read_file(&file("doc_a")).unwrap(),
            b"TOP\nmid\nBOTTOM\n"
        );
    }

    #[test]
    fn merge_their_deletion_removes_file() {
        let (_dir, mut store) = seeded();
        let base = store.working_revision().unwrap();

        store.set_active_branch(&branch("side")).unwrap();
        store.remove_files(&[file("doc_a")]).unwrap();
        let side = store.commit("delete doc_a", "tests").unwrap();

        store.checkout(&base).unwrap();
        let outcome = store.merge(&side).unwrap();
        assert!(outcome.is_clean());
        assert_eq!(outcome.removed, 1);
        assert!(!store.file_exists(&file("doc_a")));
    }

    // -- files --

    #[test]
    fn add_file_requires_written_content() {
        let (_dir, mut store) = fresh();
        let err = store.add_file(&file("doc_ghost")).unwrap_err();
        assert!(matches!(err, StoreError::FileNotTracked { .. }));
    }

    #[test]
    fn read_untracked_fails() {
        let (_dir, mut store) = fresh();
        store.write_file(&file("doc_x"), b"data").unwrap();
        // Written but never added.
        assert!(matches!(
            store.read_file(&file("doc_x")).unwrap_err(),
            StoreError::FileNotTracked { .. }
        ));
    }

    #[test]
    fn list_tracked_files_sorted() {
        let (_dir, mut store) = fresh();
        for name in ["doc_c", "doc_a", "doc_b"] {
            store.write_file(&file(name), b"x").unwrap();
            store.add_file(&file(name)).unwrap();
        }
        let listed = store.list_tracked_files();
        assert_eq!(listed, vec![file("doc_a"), file("doc_b"), file("doc_c")]);
    }

    #[test]
    fn file_size_comes_from_metadata() {
        let (_dir, store) = seeded();
        assert_eq!(store.file_size(&file("doc_a")).unwrap(), 3);
        assert!(matches!(
            store.file_size(&file("doc_ghost")).unwrap_err(),
            StoreError::FileNotTracked { .. }
        ));
    }

    #[test]
    fn snapshot_reads_do_not_touch_working_tree() {
        let (_dir, mut store) = seeded();
        let v1 = store.working_revision().unwrap();
        store.write_file(&file("doc_a"), b"v2\n").unwrap();
        store.commit("second", "tests").unwrap();

        assert_eq!(store.read_file_at(&v1, &file("doc_a")).unwrap(), b"v1\n");
        assert_eq!(store.tracked_files_at(&v1).unwrap(), vec![file("doc_a")]);
        // Working tree still holds v2.
        assert_eq!(store.read_file(&file("doc_a")).unwrap(), b"v2\n");
    }

    #[test]
    fn read_file_at_missing_fails() {
        let (_dir, store) = seeded();
        let rev = store.working_revision().unwrap();
        assert!(matches!(
            store.read_file_at(&rev, &file("doc_ghost")).unwrap_err(),
            StoreError::FileNotTracked { .. }
        ));
    }
}
