//! Identifier encoding: caller-facing ids → branch and file names.
//!
//! Document and user ids are nearly arbitrary strings, but branch names and
//! file ids live in a restricted alphabet. The bridge is a total injective
//! encoding: `[a-z0-9]` pass through, every other byte becomes `_` followed
//! by two lowercase hex digits. Underscore itself is escaped (`_5f`), so an
//! escape sequence can never be confused with literal text and two distinct
//! inputs can never encode alike.
//!
//! Derived names:
//! - personal branch: `personal_<enc(user)>_doc_<enc(doc)>`
//! - document body file: `doc_<enc(doc)>`
//! - document part file: `doc_<enc(doc)>_24<enc(part)>` (`_24` encodes `$`,
//!   the part separator)
//!
//! The separator `_doc_` cannot appear inside encoded text: after any `_`
//! the encoder emits exactly two hex digits, and `o` is not one. `_24` is
//! exactly the escape of `$`, which is why [`DocumentId`] rejects `$` —
//! with it banned, the document half of a file id can never contain the
//! part separator and the overall mapping stays injective.

use bindery_store::{BranchName, FileId};

use crate::error::EngineError;
use crate::model::{DocumentId, UserId};

/// Separator between the user and document halves of a personal branch name.
const BRANCH_SEP: &str = "_doc_";

/// Prefix of every personal branch name.
const BRANCH_PREFIX: &str = "personal_";

/// Prefix of every document file id.
const FILE_PREFIX: &str = "doc_";

/// Encoded form of `$`, separating a document from a part in a file id.
const PART_SEP: &str = "_24";

/// Maximum raw length of a part name, in bytes. Keeps every derived file id
/// under the 255-byte filesystem limit.
pub const MAX_PART_LEN: usize = 40;

// ---------------------------------------------------------------------------
// Core encoding
// ---------------------------------------------------------------------------

/// Encode an arbitrary string into the `[a-z0-9_]` alphabet.
#[must_use]
pub fn encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if b.is_ascii_lowercase() || b.is_ascii_digit() {
            out.push(b as char);
        } else {
            out.push('_');
            out.push(hex_char(b >> 4));
            out.push(hex_char(b & 0x0f));
        }
    }
    out
}

/// Decode a string produced by [`encode`].
///
/// # Errors
/// Returns [`EngineError::InvalidId`] on malformed escapes or when the
/// decoded bytes are not valid UTF-8.
pub fn decode(s: &str) -> Result<String, EngineError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                let (Some(&hi), Some(&lo)) = (bytes.get(i + 1), bytes.get(i + 2)) else {
                    return Err(invalid(s, "truncated escape sequence"));
                };
                let (Some(hi), Some(lo)) = (hex_val(hi), hex_val(lo)) else {
                    return Err(invalid(s, "non-hex digit in escape sequence"));
                };
                out.push((hi << 4) | lo);
                i += 3;
            }
            b if b.is_ascii_lowercase() || b.is_ascii_digit() => {
                out.push(b);
                i += 1;
            }
            b => {
                return Err(invalid(s, &format!("unexpected character '{}'", b as char)));
            }
        }
    }
    String::from_utf8(out).map_err(|_| invalid(s, "decoded bytes are not valid UTF-8"))
}

fn hex_char(nibble: u8) -> char {
    char::from_digit(u32::from(nibble), 16).unwrap_or('0')
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

fn invalid(value: &str, reason: &str) -> EngineError {
    EngineError::InvalidId {
        value: value.to_owned(),
        reason: reason.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Branch names
// ---------------------------------------------------------------------------

/// The personal branch name for `user`'s cabinet bound to `document`.
///
/// # Errors
/// Never fails for ids accepted by [`UserId`] and [`DocumentId`] — the
/// `Result` only exists because [`BranchName`] validates on construction.
pub fn personal_branch(user: &UserId, document: &DocumentId) -> Result<BranchName, EngineError> {
    let name = format!(
        "{BRANCH_PREFIX}{}{BRANCH_SEP}{}",
        encode(user.as_str()),
        encode(document.as_str())
    );
    BranchName::new(&name).map_err(|e| EngineError::InvalidId {
        value: name,
        reason: e.to_string(),
    })
}

/// Recover `(user, document)` from a personal branch name, or `None` for
/// branches that do not follow the personal naming convention.
#[must_use]
pub fn parse_personal_branch(branch: &BranchName) -> Option<(UserId, DocumentId)> {
    let rest = branch.as_str().strip_prefix(BRANCH_PREFIX)?;
    let (user_enc, doc_enc) = rest.split_once(BRANCH_SEP)?;
    let user = UserId::new(&decode(user_enc).ok()?).ok()?;
    let document = DocumentId::new(&decode(doc_enc).ok()?).ok()?;
    Some((user, document))
}

// ---------------------------------------------------------------------------
// File ids
// ---------------------------------------------------------------------------

/// The file id holding `document`'s body.
///
/// # Errors
/// Never fails for ids accepted by [`DocumentId`]; see [`personal_branch`].
pub fn body_file(document: &DocumentId) -> Result<FileId, EngineError> {
    let id = format!("{FILE_PREFIX}{}", encode(document.as_str()));
    FileId::new(&id).map_err(|e| EngineError::InvalidId {
        value: id,
        reason: e.to_string(),
    })
}

/// The file id holding the named part of `document`.
///
/// # Errors
/// Fails with [`EngineError::InvalidId`] when the part name is empty or
/// longer than [`MAX_PART_LEN`] bytes.
pub fn part_file(document: &DocumentId, part: &str) -> Result<FileId, EngineError> {
    if part.is_empty() {
        return Err(invalid(part, "part name must not be empty"));
    }
    if part.len() > MAX_PART_LEN {
        return Err(invalid(
            part,
            &format!("part name must be at most {MAX_PART_LEN} bytes"),
        ));
    }
    let id = format!(
        "{FILE_PREFIX}{}{PART_SEP}{}",
        encode(document.as_str()),
        encode(part)
    );
    FileId::new(&id).map_err(|e| EngineError::InvalidId {
        value: id,
        reason: e.to_string(),
    })
}

/// Recover the document id from a file id following the `doc_*` convention.
///
/// Only the body file maps back to a bare document id; part files and
/// unrelated files return `None`.
#[must_use]
pub fn parse_body_file(id: &FileId) -> Option<DocumentId> {
    let enc = id.as_str().strip_prefix(FILE_PREFIX)?;
    if enc.contains(PART_SEP) {
        return None;
    }
    DocumentId::new(&decode(enc).ok()?).ok()
}

/// Returns `true` if `id` belongs to `document` — its body file or any of
/// its part files. Used to enforce branch isolation.
#[must_use]
pub fn file_belongs_to(id: &FileId, document: &DocumentId) -> bool {
    let Some(rest) = id.as_str().strip_prefix(FILE_PREFIX) else {
        return false;
    };
    let enc = encode(document.as_str());
    match rest.strip_prefix(&enc) {
        Some("") => true,
        Some(tail) => tail.starts_with(PART_SEP),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
