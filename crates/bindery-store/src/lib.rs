//! Version storage for the bindery document engine.
//!
//! This crate owns the changeset graph and everything that touches it: the
//! [`VersionStore`] trait the engine programs against, the file-backed
//! [`FsStore`] implementation, the three-way text merge, and the validated
//! identifier types that cross the boundary. The engine crate never reaches
//! past this trait — if a different backend ever materializes, it lands here.

mod fs_store;

pub mod error;
pub mod merge3;
pub mod store;
pub mod types;

pub use error::StoreError;
pub use fs_store::FsStore;
pub use store::VersionStore;
pub use types::{
    BranchName, BranchNameError, FileId, FileIdError, MergeOutcome, RevisionId, RevisionIdError,
};
