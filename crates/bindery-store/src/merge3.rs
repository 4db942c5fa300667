//! Line-based three-way merge.
//!
//! The store's merge primitive: given a common ancestor and two descendant
//! versions of a file, produce a merged version. Changes confined to one
//! side apply directly; identical changes collapse; overlapping differing
//! changes produce a conflict region delimited with `<<<<<<<`/`=======`/
//! `>>>>>>>` markers.
//!
//! The implementation diffs each side against the base with a line-level
//! LCS, then combines the two hunk lists by base range. This is a pure
//! function over byte slices; binary (non-line-structured) content degrades
//! to whole-file semantics.

/// Result of a three-way merge of one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeResult {
    /// The merge resolved without conflicts.
    Clean(Vec<u8>),
    /// The merge produced `regions` conflict regions; `content` contains
    /// conflict markers and must not be committed as-is.
    Conflicted {
        /// Merged content including conflict markers.
        content: Vec<u8>,
        /// Number of conflict regions.
        regions: usize,
    },
}

impl MergeResult {
    /// Returns `true` for a conflict-free merge.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        matches!(self, Self::Clean(_))
    }

    /// Return the merged content regardless of conflict state.
    #[must_use]
    pub fn into_content(self) -> Vec<u8> {
        match self {
            Self::Clean(content) | Self::Conflicted { content, .. } => content,
        }
    }
}

/// A changed region: base lines `[base_start, base_end)` were replaced by
/// side lines `[side_start, side_end)`.
#[derive(Clone, Copy, Debug)]
struct Hunk {
    base_start: usize,
    base_end: usize,
    side_start: usize,
    side_end: usize,
}

/// Beyond this many cells the LCS table is not worth building; fall back to
/// treating the whole file as one hunk per side.
const MAX_LCS_CELLS: usize = 1 << 24;

/// Merge `ours` and `theirs` relative to their common ancestor `base`.
///
/// `our_label` and `their_label` name the two sides in conflict markers.
#[must_use]
pub fn merge_file(
    base: &[u8],
    ours: &[u8],
    theirs: &[u8],
    our_label: &str,
    their_label: &str,
) -> MergeResult {
    // Trivial cases short-circuit the diff entirely.
    if ours == theirs {
        return MergeResult::Clean(ours.to_vec());
    }
    if ours == base {
        return MergeResult::Clean(theirs.to_vec());
    }
    if theirs == base {
        return MergeResult::Clean(ours.to_vec());
    }

    let base_lines = split_lines(base);
    let our_lines = split_lines(ours);
    let their_lines = split_lines(theirs);

    let our_hunks = diff_hunks(&base_lines, &our_lines);
    let their_hunks = diff_hunks(&base_lines, &their_lines);

    combine(
        &base_lines,
        &our_lines,
        &their_lines,
        &our_hunks,
        &their_hunks,
        our_label,
        their_label,
    )
}

/// Split content into lines, each retaining its trailing newline (if any),
/// so concatenation reproduces the input byte-for-byte.
fn split_lines(content: &[u8]) -> Vec<&[u8]> {
    content.split_inclusive(|&b| b == b'\n').collect()
}

/// Diff `side` against `base`, returning the changed regions.
fn diff_hunks(base: &[&[u8]], side: &[&[u8]]) -> Vec<Hunk> {
    let matched = lcs_matches(base, side);
    let mut hunks = Vec::new();

    let mut bi = 0;
    let mut si = 0;
    for &(mb, ms) in &matched {
        if bi != mb || si != ms {
            hunks.push(Hunk {
                base_start: bi,
                base_end: mb,
                side_start: si,
                side_end: ms,
            });
        }
        bi = mb + 1;
        si = ms + 1;
    }
    if bi != base.len() || si != side.len() {
        hunks.push(Hunk {
            base_start: bi,
            base_end: base.len(),
            side_start: si,
            side_end: side.len(),
        });
    }
    hunks
}

/// Longest-common-subsequence matches between `a` and `b`, as aligned
/// `(a_index, b_index)` pairs in increasing order.
fn lcs_matches(a: &[&[u8]], b: &[&[u8]]) -> Vec<(usize, usize)> {
    // Anchor on the common prefix and suffix first; the DP table only covers
    // the differing middle, which keeps the table small for typical edits.
    let mut prefix = 0;
    while prefix < a.len() && prefix < b.len() && a[prefix] == b[prefix] {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < a.len() - prefix && suffix < b.len() - prefix {
        if a[a.len() - 1 - suffix] != b[b.len() - 1 - suffix] {
            break;
        }
        suffix += 1;
    }

    let ma = &a[prefix..a.len() - suffix];
    let mb = &b[prefix..b.len() - suffix];

    let mut matches: Vec<(usize, usize)> = (0..prefix).map(|i| (i, i)).collect();

    if !ma.is_empty() && !mb.is_empty() {
        if ma.len().saturating_mul(mb.len()) > MAX_LCS_CELLS {
            // Middle too large to diff; treat it as fully rewritten.
        } else {
            let n = ma.len();
            let m = mb.len();
            let mut table = vec![0u32; (n + 1) * (m + 1)];
            let idx = |i: usize, j: usize| i * (m + 1) + j;
            for i in (0..n).rev() {
                for j in (0..m).rev() {
                    table[idx(i, j)] = if ma[i] == mb[j] {
                        table[idx(i + 1, j + 1)] + 1
                    } else {
                        table[idx(i + 1, j)].max(table[idx(i, j + 1)])
                    };
                }
            }
            let (mut i, mut j) = (0, 0);
            while i < n && j < m {
                if ma[i] == mb[j] {
                    matches.push((prefix + i, prefix + j));
                    i += 1;
                    j += 1;
                } else if table[idx(i + 1, j)] >= table[idx(i, j + 1)] {
                    i += 1;
                } else {
                    j += 1;
                }
            }
        }
    }

    for k in 0..suffix {
        matches.push((a.len() - suffix + k, b.len() - suffix + k));
    }
    matches
}

/// Combine the two hunk lists over the base, emitting merged output.
fn combine(
    base: &[&[u8]],
    ours: &[&[u8]],
    theirs: &[&[u8]],
    our_hunks: &[Hunk],
    their_hunks: &[Hunk],
    our_label: &str,
    their_label: &str,
) -> MergeResult {
    let mut out: Vec<u8> = Vec::new();
    let mut regions = 0;
    let mut base_pos = 0;

    let mut oi = 0;
    let mut ti = 0;

    while oi < our_hunks.len() || ti < their_hunks.len() {
        // Pick the next hunk group: the earliest hunk, extended while hunks
        // from either side overlap the group's base range. Insertions at the
        // same base point (empty ranges) also group together.
        let (group_start, mut group_end) = match (our_hunks.get(oi), their_hunks.get(ti)) {
            (Some(o), Some(t)) => {
                if o.base_start <= t.base_start {
                    (o.base_start, o.base_end)
                } else {
                    (t.base_start, t.base_end)
                }
            }
            (Some(o), None) => (o.base_start, o.base_end),
            (None, Some(t)) => (t.base_start, t.base_end),
            (None, None) => break,
        };

        let group_oi = oi;
        let group_ti = ti;
        loop {
            let mut grew = false;
            while let Some(o) = our_hunks.get(oi) {
                if hunk_touches(o, group_start, group_end) {
                    group_end = group_end.max(o.base_end);
                    oi += 1;
                    grew = true;
                } else {
                    break;
                }
            }
            while let Some(t) = their_hunks.get(ti) {
                if hunk_touches(t, group_start, group_end) {
                    group_end = group_end.max(t.base_end);
                    ti += 1;
                    grew = true;
                } else {
                    break;
                }
            }
            if !grew {
                break;
            }
        }

        // Copy unchanged base lines up to the group.
        for line in &base[base_pos..group_start] {
            out.extend_from_slice(line);
        }
        base_pos = group_end;

        let ours_changed = oi > group_oi;
        let theirs_changed = ti > group_ti;

        match (ours_changed, theirs_changed) {
            (true, false) => {
                let (s, e) = side_range(&our_hunks[group_oi..oi], group_start, group_end);
                for line in &ours[s..e] {
                    out.extend_from_slice(line);
                }
            }
            (false, true) => {
                let (s, e) = side_range(&their_hunks[group_ti..ti], group_start, group_end);
                for line in &theirs[s..e] {
                    out.extend_from_slice(line);
                }
            }
            (true, true) => {
                let (os, oe) = side_range(&our_hunks[group_oi..oi], group_start, group_end);
                let (ts, te) = side_range(&their_hunks[group_ti..ti], group_start, group_end);
                if ours[os..oe] == theirs[ts..te] {
                    // Both sides made the same change.
                    for line in &ours[os..oe] {
                        out.extend_from_slice(line);
                    }
                } else {
                    regions += 1;
                    emit_conflict(
                        &mut out,
                        &ours[os..oe],
                        &theirs[ts..te],
                        our_label,
                        their_label,
                    );
                }
            }
            (false, false) => unreachable!("a hunk group contains at least one hunk"),
        }
    }

    for line in &base[base_pos..] {
        out.extend_from_slice(line);
    }

    if regions == 0 {
        MergeResult::Clean(out)
    } else {
        MergeResult::Conflicted {
            content: out,
            regions,
        }
    }
}

/// Whether a hunk belongs to the group covering base `[start, end)`.
/// Empty ranges (pure insertions) count when they sit inside the range or at
/// the same point as another empty range.
const fn hunk_touches(h: &Hunk, start: usize, end: usize) -> bool {
    if h.base_start == h.base_end {
        // insertion point inside or at the boundary of the group
        h.base_start >= start && h.base_start <= end && !(start == end && h.base_start != start)
    } else {
        h.base_start < end && start < h.base_end
    }
}

/// Map a group's base range `[group_start, group_end)` to the side's line
/// range, using the side hunks that are part of the group. Lines between and
/// around the hunks map one-to-one from the base.
fn side_range(hunks: &[Hunk], group_start: usize, group_end: usize) -> (usize, usize) {
    // The side range starts group-aligned before the first hunk and ends
    // group-aligned after the last: unchanged base lines inside the group
    // shift by the cumulative delta of prior hunks.
    let first = &hunks[0];
    let last = &hunks[hunks.len() - 1];
    let start = first.side_start - (first.base_start - group_start);
    let end = last.side_end + (group_end - last.base_end);
    (start, end)
}

fn emit_conflict(
    out: &mut Vec<u8>,
    ours: &[&[u8]],
    theirs: &[&[u8]],
    our_label: &str,
    their_label: &str,
) {
    out.extend_from_slice(format!("<<<<<<< {our_label}\n").as_bytes());
    for line in ours {
        out.extend_from_slice(line);
        if !line.ends_with(b"\n") {
            out.push(b'\n');
        }
    }
    out.extend_from_slice(b"=======\n");
    for line in theirs {
        out.extend_from_slice(line);
        if !line.ends_with(b"\n") {
            out.push(b'\n');
        }
    }
    out.extend_from_slice(format!(">>>>>>> {their_label}\n").as_bytes());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
