//! Core types for the bindery store boundary.
//!
//! These types form the vocabulary shared between the
//! [`VersionStore`](crate::VersionStore) trait and the engine crate. They
//! intentionally contain no backend-specific types — how revisions are
//! persisted is an implementation detail.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RevisionId
// ---------------------------------------------------------------------------

/// A revision identifier — the SHA-256 of a changeset's canonical encoding.
///
/// Stored as raw bytes for efficient comparison and hashing. Displays as
/// 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RevisionId([u8; 32]);

impl RevisionId {
    /// Create a `RevisionId` from raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Return the 64-character lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.to_string()
    }

    /// Return an abbreviated (12-character) hex form for log output.
    #[must_use]
    pub fn short(&self) -> String {
        let mut s = self.to_string();
        s.truncate(12);
        s
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RevisionId({})", self.short())
    }
}

impl FromStr for RevisionId {
    type Err = RevisionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(RevisionIdError {
                value: s.to_owned(),
                reason: format!("expected 64 hex characters, got {}", s.len()),
            });
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let hi = hex_digit(chunk[0]).ok_or_else(|| RevisionIdError {
                value: s.to_owned(),
                reason: format!("invalid hex digit '{}'", chunk[0] as char),
            })?;
            let lo = hex_digit(chunk[1]).ok_or_else(|| RevisionIdError {
                value: s.to_owned(),
                reason: format!("invalid hex digit '{}'", chunk[1] as char),
            })?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for RevisionId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RevisionId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error from parsing a hex string into a [`RevisionId`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevisionIdError {
    /// The raw value that failed.
    pub value: String,
    /// Why it failed.
    pub reason: String,
}

impl fmt::Display for RevisionIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid revision id {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for RevisionIdError {}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// BranchName
// ---------------------------------------------------------------------------

/// A validated branch name.
///
/// Branch names are 1–255 characters of `[a-z0-9._-]` and must not start
/// with `.` or `-`. The engine derives them from sanitized identifiers, so
/// this alphabet is never a caller-visible restriction.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// The maximum length of a branch name.
    pub const MAX_LEN: usize = 255;

    /// Create a new `BranchName`, validating format.
    ///
    /// # Errors
    /// Returns an error if the name is empty, too long, starts with `.` or
    /// `-`, or contains characters outside `[a-z0-9._-]`.
    pub fn new(s: &str) -> Result<Self, BranchNameError> {
        Self::validate(s)?;
        Ok(Self(s.to_owned()))
    }

    /// Return the branch name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), BranchNameError> {
        if s.is_empty() {
            return Err(BranchNameError {
                value: s.to_owned(),
                reason: "branch name must not be empty".to_owned(),
            });
        }
        if s.len() > Self::MAX_LEN {
            return Err(BranchNameError {
                value: s.to_owned(),
                reason: format!(
                    "branch name must be at most {} characters, got {}",
                    Self::MAX_LEN,
                    s.len()
                ),
            });
        }
        if s.starts_with('.') || s.starts_with('-') {
            return Err(BranchNameError {
                value: s.to_owned(),
                reason: "branch name must not start with '.' or '-'".to_owned(),
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
        {
            return Err(BranchNameError {
                value: s.to_owned(),
                reason:
                    "branch name must contain only lowercase letters, digits, '.', '_', and '-'"
                        .to_owned(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BranchName {
    type Err = BranchNameError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for BranchName {
    type Error = BranchNameError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::validate(&s)?;
        Ok(Self(s))
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

/// Error from validating a [`BranchName`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchNameError {
    /// The invalid value.
    pub value: String,
    /// Why validation failed.
    pub reason: String,
}

impl fmt::Display for BranchNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid branch name {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for BranchNameError {}

// ---------------------------------------------------------------------------
// FileId
// ---------------------------------------------------------------------------

/// A validated tracked-file identifier.
///
/// File ids name entries in a changeset snapshot and files in the working
/// tree. They are flat (no `/`), NUL-free, never start with `.` (so they
/// cannot collide with the store's own metadata directory), and are at most
/// 255 bytes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId(String);

impl FileId {
    /// The maximum length of a file id, in bytes.
    pub const MAX_LEN: usize = 255;

    /// Create a new `FileId`, validating format.
    ///
    /// # Errors
    /// Returns an error if the id is empty, too long, starts with `.`, or
    /// contains `/` or NUL.
    pub fn new(s: &str) -> Result<Self, FileIdError> {
        Self::validate(s)?;
        Ok(Self(s.to_owned()))
    }

    /// Return the file id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), FileIdError> {
        if s.is_empty() {
            return Err(FileIdError {
                value: s.to_owned(),
                reason: "file id must not be empty".to_owned(),
            });
        }
        if s.len() > Self::MAX_LEN {
            return Err(FileIdError {
                value: s.to_owned(),
                reason: format!(
                    "file id must be at most {} bytes, got {}",
                    Self::MAX_LEN,
                    s.len()
                ),
            });
        }
        if s.starts_with('.') {
            return Err(FileIdError {
                value: s.to_owned(),
                reason: "file id must not start with '.'".to_owned(),
            });
        }
        if s.contains('/') || s.contains('\0') {
            return Err(FileIdError {
                value: s.to_owned(),
                reason: "file id must not contain '/' or NUL".to_owned(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FileId {
    type Err = FileIdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for FileId {
    type Error = FileIdError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::validate(&s)?;
        Ok(Self(s))
    }
}

impl From<FileId> for String {
    fn from(id: FileId) -> Self {
        id.0
    }
}

/// Error from validating a [`FileId`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileIdError {
    /// The invalid value.
    pub value: String,
    /// Why validation failed.
    pub reason: String,
}

impl fmt::Display for FileIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid file id {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for FileIdError {}

// ---------------------------------------------------------------------------
// MergeOutcome
// ---------------------------------------------------------------------------

/// The result of merging a revision into the working tree.
///
/// Mirrors the four counters a merge produces: files taken from the other
/// side, files merged cleanly, files removed, and files left with conflict
/// markers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Files updated wholesale from the incoming revision.
    pub updated: usize,
    /// Files where both sides changed and the three-way merge resolved cleanly.
    pub merged: usize,
    /// Files removed by the merge.
    pub removed: usize,
    /// Files left with conflict markers, needing manual resolution.
    pub unresolved: Vec<FileId>,
}

impl MergeOutcome {
    /// Returns `true` if the merge left no unresolved files.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
