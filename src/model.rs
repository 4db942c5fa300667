//! Domain identifiers for the bindery engine.
//!
//! [`DocumentId`] and [`UserId`] are the caller-facing names for documents
//! and cabinet owners. Validation here is deliberately loose — almost any
//! printable string is accepted, because branch and file names are derived
//! through an injective encoding rather than by embedding these values
//! verbatim. The length caps exist so every derived name stays under the
//! 255-byte filesystem limit.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// DocumentId
// ---------------------------------------------------------------------------

/// A document identifier, chosen by the caller.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// The maximum length of a document id, in bytes.
    pub const MAX_LEN: usize = 40;

    /// Create a new `DocumentId`, validating format.
    ///
    /// `$` is reserved as the document/part separator in derived file
    /// names, so a document id containing it could collide with a part
    /// file of another document.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidId`] if the id is empty, longer than
    /// [`Self::MAX_LEN`] bytes, contains control characters, or contains
    /// `$`.
    pub fn new(s: &str) -> Result<Self, EngineError> {
        validate_document_id(s)?;
        Ok(Self(s.to_owned()))
    }

    /// Return the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = EngineError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = EngineError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        validate_document_id(&s)?;
        Ok(Self(s))
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// The owner of a personal cabinet.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// The maximum length of a user id, in bytes.
    pub const MAX_LEN: usize = 32;

    /// Create a new `UserId`, validating format.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidId`] if the id is empty, longer than
    /// [`Self::MAX_LEN`] bytes, or contains control characters.
    pub fn new(s: &str) -> Result<Self, EngineError> {
        validate_id(s, "user id", Self::MAX_LEN)?;
        Ok(Self(s.to_owned()))
    }

    /// Return the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = EngineError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = EngineError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        validate_id(&s, "user id", Self::MAX_LEN)?;
        Ok(Self(s))
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// CabinetKind
// ---------------------------------------------------------------------------

/// What a cabinet is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CabinetKind {
    /// The shared line every document is published to.
    Main,
    /// One user's private line for one document.
    Personal {
        /// The bound document.
        document: DocumentId,
        /// The owning user.
        user: UserId,
    },
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_id(s: &str, kind: &str, max_len: usize) -> Result<(), EngineError> {
    if s.is_empty() {
        return Err(EngineError::InvalidId {
            value: s.to_owned(),
            reason: format!("{kind} must not be empty"),
        });
    }
    if s.len() > max_len {
        return Err(EngineError::InvalidId {
            value: s.to_owned(),
            reason: format!("{kind} must be at most {max_len} bytes, got {}", s.len()),
        });
    }
    if s.chars().any(char::is_control) {
        return Err(EngineError::InvalidId {
            value: s.to_owned(),
            reason: format!("{kind} must not contain control characters"),
        });
    }
    Ok(())
}

fn validate_document_id(s: &str) -> Result<(), EngineError> {
    validate_id(s, "document id", DocumentId::MAX_LEN)?;
    if s.contains('$') {
        return Err(EngineError::InvalidId {
            value: s.to_owned(),
            reason: "document id must not contain '$' (reserved part separator)".to_owned(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
