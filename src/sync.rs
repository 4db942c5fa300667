//! Merge-direction decisions for `update` and `share`.
//!
//! The ancestry relationship between a personal branch tip ("local") and
//! the shared branch tip ("main") fully determines which merges, if any,
//! each operation performs. The decision is extracted into pure functions
//! over [`AncestryFacts`] so it can be tested exhaustively without a store.

// ---------------------------------------------------------------------------
// Facts
// ---------------------------------------------------------------------------

/// The ancestry relationships between a personal tip and the main tip.
///
/// `local == main` is resolved by the caller before these facts are
/// gathered; all predicates here are strict (a revision is not its own
/// ancestor or parent).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AncestryFacts {
    /// Main's tip is an ancestor of the local tip: every shared change is
    /// already on the personal line.
    pub main_is_ancestor_of_local: bool,
    /// The local tip is an ancestor of main's tip: everything personal has
    /// already been absorbed by the shared line.
    pub local_is_ancestor_of_main: bool,
    /// The local tip is an immediate parent of main's tip — main's tip is
    /// the merge of this very branch.
    pub local_is_parent_of_main: bool,
    /// The common ancestor of the two tips lies on the personal branch,
    /// meaning a prior share already cross-linked the lines. A plain fork
    /// point on the shared line does not count.
    pub previously_linked: bool,
}

// ---------------------------------------------------------------------------
// Share
// ---------------------------------------------------------------------------

/// What `share` must do for a given ancestry situation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareAction {
    /// Merge the personal tip into main and commit there. The personal
    /// line already contains everything shared.
    PublishLocal,
    /// Main already has everything personal; pull main's newer changes
    /// back into the personal branch only.
    RefreshLocalOnly,
    /// The two tips are already synchronized; do nothing.
    UpToDate,
    /// Both lines moved independently: merge main into the personal branch
    /// first, then publish the result back into main.
    FullExchange,
}

/// Decide the merge direction for `share`.
#[must_use]
pub fn share_action(facts: AncestryFacts) -> ShareAction {
    if facts.main_is_ancestor_of_local {
        return ShareAction::PublishLocal;
    }
    if facts.previously_linked && !facts.local_is_ancestor_of_main {
        // The lines were cross-linked by an earlier share and only the
        // personal side moved since; main can take it directly.
        return ShareAction::PublishLocal;
    }
    if facts.local_is_ancestor_of_main {
        if facts.local_is_parent_of_main {
            return ShareAction::UpToDate;
        }
        return ShareAction::RefreshLocalOnly;
    }
    ShareAction::FullExchange
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Decide whether `update` should merge main into the personal branch.
///
/// No merge is needed when the shared changes are already present
/// (`main_is_ancestor_of_local`) or when main's tip is the merge of this
/// very branch (`local_is_parent_of_main`) — pulling that merge back in
/// would only create a pointless cross-link.
#[must_use]
pub fn update_needs_merge(facts: AncestryFacts) -> bool {
    !facts.main_is_ancestor_of_local && !facts.local_is_parent_of_main
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
