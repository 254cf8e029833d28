//! Structural three-way row merge.
//!
//! Contract:
//! - inputs are three ordered tuple maps over one primary-key space,
//!   already projected into the merged column layout
//! - output is the merged map plus the edit stream, in primary-key order
//! - two-sided divergence is a value conflict: the evidence is recorded
//!   and the `ours` row is retained in the merged map

use crate::{
    conflict::Conflict,
    store::{Row, TupleKey},
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

///
/// EditOrigin
///
/// The side whose change produced one edit. `Both` marks identical
/// one-sided additions that landed on the two sides independently.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EditOrigin {
    Ours,
    Theirs,
    Both,
}

impl fmt::Display for EditOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ours => "ours",
            Self::Theirs => "theirs",
            Self::Both => "both",
        };
        write!(f, "{label}")
    }
}

///
/// EditOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EditOp {
    Insert,
    Update,
    Delete,
}

///
/// RowEdit
///
/// One `(origin, op, key, old, new)` record of the edit stream.
///

#[derive(Clone, Debug, PartialEq)]
pub struct RowEdit {
    pub origin: EditOrigin,
    pub op: EditOp,
    pub key: TupleKey,
    pub old: Option<Row>,
    pub new: Option<Row>,
}

///
/// RowMergeOutput
///

#[derive(Debug, Default)]
pub struct RowMergeOutput {
    pub rows: BTreeMap<TupleKey, Row>,
    pub edits: Vec<RowEdit>,
    pub conflicts: Vec<Conflict>,
}

/// Merge three tuple maps key by key.
///
/// The walk visits the union of keys in ascending order, so edits come
/// out in primary-key order; at most one edit is produced per key, with
/// the ours-before-theirs tie-break folded into origin classification.
#[must_use]
pub fn merge_rows(
    base: &BTreeMap<TupleKey, Row>,
    ours: &BTreeMap<TupleKey, Row>,
    theirs: &BTreeMap<TupleKey, Row>,
) -> RowMergeOutput {
    let mut keys: BTreeSet<&TupleKey> = BTreeSet::new();
    keys.extend(base.keys());
    keys.extend(ours.keys());
    keys.extend(theirs.keys());

    let mut out = RowMergeOutput::default();

    for key in keys {
        let b = base.get(key);
        let o = ours.get(key);
        let t = theirs.get(key);

        match b {
            None => merge_added(key, o, t, &mut out),
            Some(base_row) => merge_existing(key, base_row, o, t, &mut out),
        }
    }

    out
}

// Key absent from the ancestor: additions only.
fn merge_added(key: &TupleKey, o: Option<&Row>, t: Option<&Row>, out: &mut RowMergeOutput) {
    match (o, t) {
        (None, None) => {}
        (Some(added), None) => {
            out.rows.insert(key.clone(), added.clone());
            out.edits.push(RowEdit {
                origin: EditOrigin::Ours,
                op: EditOp::Insert,
                key: key.clone(),
                old: None,
                new: Some(added.clone()),
            });
        }
        (None, Some(added)) => {
            out.rows.insert(key.clone(), added.clone());
            out.edits.push(RowEdit {
                origin: EditOrigin::Theirs,
                op: EditOp::Insert,
                key: key.clone(),
                old: None,
                new: Some(added.clone()),
            });
        }
        (Some(our_row), Some(their_row)) if our_row == their_row => {
            out.rows.insert(key.clone(), our_row.clone());
            out.edits.push(RowEdit {
                origin: EditOrigin::Both,
                op: EditOp::Insert,
                key: key.clone(),
                old: None,
                new: Some(our_row.clone()),
            });
        }
        (Some(our_row), Some(their_row)) => {
            // Divergent two-sided insert: value conflict, ours retained.
            out.rows.insert(key.clone(), our_row.clone());
            out.conflicts.push(Conflict {
                key: key.clone(),
                base: None,
                ours: Some(our_row.clone()),
                theirs: Some(their_row.clone()),
            });
        }
    }
}

// Key present in the ancestor: updates, deletes, and their collisions.
fn merge_existing(
    key: &TupleKey,
    base_row: &Row,
    o: Option<&Row>,
    t: Option<&Row>,
    out: &mut RowMergeOutput,
) {
    let ours_changed = o != Some(base_row);
    let theirs_changed = t != Some(base_row);

    match (ours_changed, theirs_changed) {
        (false, false) => {
            out.rows.insert(key.clone(), base_row.clone());
        }
        (true, false) => apply_one_sided(key, base_row, o, EditOrigin::Ours, out),
        (false, true) => apply_one_sided(key, base_row, t, EditOrigin::Theirs, out),
        (true, true) => {
            if o == t {
                // Convergent change (including convergent delete): no edit.
                if let Some(row) = o {
                    out.rows.insert(key.clone(), row.clone());
                }
                return;
            }

            // Divergent change, delete-versus-modify included: value
            // conflict, ours retained.
            if let Some(our_row) = o {
                out.rows.insert(key.clone(), our_row.clone());
            }
            out.conflicts.push(Conflict {
                key: key.clone(),
                base: Some(base_row.clone()),
                ours: o.cloned(),
                theirs: t.cloned(),
            });
        }
    }
}

fn apply_one_sided(
    key: &TupleKey,
    base_row: &Row,
    side: Option<&Row>,
    origin: EditOrigin,
    out: &mut RowMergeOutput,
) {
    match side {
        Some(changed) => {
            out.rows.insert(key.clone(), changed.clone());
            out.edits.push(RowEdit {
                origin,
                op: EditOp::Update,
                key: key.clone(),
                old: Some(base_row.clone()),
                new: Some(changed.clone()),
            });
        }
        None => {
            out.edits.push(RowEdit {
                origin,
                op: EditOp::Delete,
                key: key.clone(),
                old: Some(base_row.clone()),
                new: None,
            });
        }
    }
}
