//! bindery — a branch-based document versioning engine.
//!
//! Each tracked document is a line of immutable revisions inside a
//! changeset DAG. Every (document, user) pair gets an isolated personal
//! cabinet forked from the shared Main Cabinet; `update` pulls shared
//! changes into a personal cabinet and `share` publishes personal changes
//! back, with the merge direction decided from the ancestry between the
//! two branch tips.
//!
//! The storage boundary is the `VersionStore` trait from the
//! `bindery-store` crate; the engine never touches a concrete backend
//! directly.

pub mod cabinet;
pub mod config;
pub mod document;
pub mod error;
pub mod ident;
pub mod model;
pub mod repository;
pub mod shelf;
pub mod sync;

pub use cabinet::Cabinet;
pub use config::BinderyConfig;
pub use document::Document;
pub use error::EngineError;
pub use model::{CabinetKind, DocumentId, UserId};
pub use repository::{Repository, Txn};
pub use shelf::Shelf;
pub use sync::{AncestryFacts, ShareAction};
