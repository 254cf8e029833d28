//! Branches, commits, and the working set.
//!
//! A deliberately small repository layer: enough commit-graph structure
//! to resolve merge bases, detect fast-forwards, and drive the merge
//! engine end to end. Commit ids derive from content (root id, parents,
//! message), so identical histories name identical commits.

use crate::{
    commit::{StatusReport, check_commit, status},
    error::{ErrorClass, ErrorOrigin, InternalError},
    hash::digest_hex,
    merge::{MergeOutcome, merge_roots},
    obs::{MergeOutcomeKind, MetricsEvent, record},
    schema::TableSchema,
    serialize::{deserialize, serialize},
    session::SessionConfig,
    store::{IndexMap, Root, TupleKey, index_key_for_columns},
    value::Value,
    verify::{VerifyOptions, VerifyReport, verify_constraints},
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Branch every new repository starts on.
pub const DEFAULT_BRANCH: &str = "main";

///
/// CommitId
///

#[derive(Clone, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct CommitId(String);

impl CommitId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

///
/// Commit
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Commit {
    pub id: CommitId,
    pub parents: Vec<CommitId>,
    pub message: String,
    /// Seconds since the Unix epoch; excluded from the id derivation so
    /// identical histories keep identical ids.
    pub committed_at: u64,
    pub root: Root,
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

fn commit_id(root: &Root, parents: &[CommitId], message: &str) -> Result<CommitId, InternalError> {
    let mut payload = Vec::new();
    payload.extend_from_slice(root.root_ish()?.as_bytes());
    for parent in parents {
        payload.push(0u8);
        payload.extend_from_slice(parent.as_str().as_bytes());
    }
    payload.push(0u8);
    payload.extend_from_slice(message.as_bytes());
    Ok(CommitId(digest_hex("braid:commit:v1", &payload)))
}

///
/// MergeState
///
/// The active merge: recorded at publication, cleared by the next
/// commit. Status reporting and repeated-merge refusal both read it.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MergeState {
    pub from_ref: String,
    pub from_commit: CommitId,
    pub violation_tables: Vec<String>,
    pub conflict_tables: Vec<String>,
}

///
/// RepoMergeReport
///

#[derive(Clone, Debug)]
pub struct RepoMergeReport {
    pub outcome: MergeOutcome,
    pub fast_forward: bool,
    pub already_up_to_date: bool,
    pub violations: u64,
    pub conflicts: u64,
}

///
/// Repository
///
/// Named branches over a commit graph plus one mutable working root.
/// The session record rides with the repository so the commit gate and
/// write paths see one explicit policy value, never a global.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Repository {
    branches: BTreeMap<String, CommitId>,
    commits: BTreeMap<CommitId, Commit>,
    head: String,
    working: Root,
    merge_state: Option<MergeState>,
    session: SessionConfig,
}

impl Repository {
    /// Create a repository with one empty root commit on `main`.
    pub fn init() -> Result<Self, InternalError> {
        let root = Root::new();
        let id = commit_id(&root, &[], "initialize repository")?;
        let commit = Commit {
            id: id.clone(),
            parents: Vec::new(),
            message: "initialize repository".to_string(),
            committed_at: unix_now(),
            root: root.clone(),
        };

        let mut commits = BTreeMap::new();
        commits.insert(id.clone(), commit);
        let mut branches = BTreeMap::new();
        branches.insert(DEFAULT_BRANCH.to_string(), id);

        Ok(Self {
            branches,
            commits,
            head: DEFAULT_BRANCH.to_string(),
            working: root,
            merge_state: None,
            session: SessionConfig::default(),
        })
    }

    // --- persistence

    pub fn to_bytes(&self) -> Result<Vec<u8>, InternalError> {
        Ok(serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InternalError> {
        let repo: Self = deserialize(bytes)?;
        if !repo.branches.contains_key(&repo.head) {
            return Err(InternalError::corruption(
                ErrorOrigin::Repo,
                format!("repository head '{}' names a missing branch", repo.head),
            ));
        }
        Ok(repo)
    }

    // --- accessors

    #[must_use]
    pub fn head_branch(&self) -> &str {
        &self.head
    }

    #[must_use]
    pub fn branch_names(&self) -> Vec<&str> {
        self.branches.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub const fn working(&self) -> &Root {
        &self.working
    }

    pub fn working_mut(&mut self) -> &mut Root {
        &mut self.working
    }

    #[must_use]
    pub const fn session(&self) -> &SessionConfig {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionConfig {
        &mut self.session
    }

    #[must_use]
    pub const fn merge_state(&self) -> Option<&MergeState> {
        self.merge_state.as_ref()
    }

    pub fn head_commit(&self) -> Result<&Commit, InternalError> {
        let id = self.branches.get(&self.head).ok_or_else(|| {
            InternalError::corruption(
                ErrorOrigin::Repo,
                format!("head branch '{}' has no commit", self.head),
            )
        })?;
        self.try_commit(id)
    }

    fn try_commit(&self, id: &CommitId) -> Result<&Commit, InternalError> {
        self.commits.ok_or_commit(id)
    }

    /// History of the current head, newest first.
    pub fn log(&self) -> Result<Vec<&Commit>, InternalError> {
        let mut out = Vec::new();
        let mut cursor = Some(self.head_commit()?);
        while let Some(commit) = cursor {
            out.push(commit);
            cursor = match commit.parents.first() {
                Some(parent) => Some(self.try_commit(parent)?),
                None => None,
            };
        }
        Ok(out)
    }

    /// Resolve a ref: a branch name or a full/short commit id.
    pub fn resolve(&self, reference: &str) -> Result<&Commit, InternalError> {
        if let Some(id) = self.branches.get(reference) {
            return self.try_commit(id);
        }

        let mut matches = self
            .commits
            .keys()
            .filter(|id| id.as_str().starts_with(reference));
        match (matches.next(), matches.next()) {
            (Some(id), None) => self.try_commit(id),
            (Some(_), Some(_)) => Err(InternalError::new(
                ErrorClass::Conflict,
                ErrorOrigin::Repo,
                format!("ref '{reference}' is ambiguous"),
            )),
            (None, _) => Err(InternalError::not_found(
                ErrorOrigin::Repo,
                format!("ref '{reference}' not found"),
            )),
        }
    }

    // --- branching

    /// Create `name` at the current head commit.
    pub fn create_branch(&mut self, name: &str) -> Result<(), InternalError> {
        if self.branches.contains_key(name) {
            return Err(InternalError::new(
                ErrorClass::Conflict,
                ErrorOrigin::Repo,
                format!("branch '{name}' already exists"),
            ));
        }
        let id = self.head_commit()?.id.clone();
        self.branches.insert(name.to_string(), id);
        Ok(())
    }

    /// Switch the working set to another branch.
    ///
    /// Refused while the working set differs from HEAD: a checkout never
    /// silently discards work, sidecars included.
    pub fn checkout(&mut self, name: &str) -> Result<(), InternalError> {
        if !self.branches.contains_key(name) {
            return Err(InternalError::not_found(
                ErrorOrigin::Repo,
                format!("branch '{name}' not found"),
            ));
        }
        if self.is_working_dirty()? {
            return Err(InternalError::new(
                ErrorClass::Conflict,
                ErrorOrigin::Repo,
                "working set has uncommitted changes; commit or reset them before checkout",
            ));
        }

        self.head = name.to_string();
        self.working = self.head_commit()?.root.clone();
        self.merge_state = None;
        Ok(())
    }

    pub fn is_working_dirty(&self) -> Result<bool, InternalError> {
        Ok(self.head_commit()?.root != self.working)
    }

    // --- committing

    /// Commit the working root onto the head branch.
    ///
    /// The gate runs first; a forced commit preserves populated sidecars
    /// in the new commit rather than clearing them.
    pub fn commit(&mut self, message: &str, force: bool) -> Result<CommitId, InternalError> {
        check_commit(&self.working, &self.session, force)?;

        let mut root = self.working.clone();
        root.prune_empty();

        let mut parents = vec![self.head_commit()?.id.clone()];
        if let Some(state) = &self.merge_state {
            if state.from_commit != parents[0] {
                parents.push(state.from_commit.clone());
            }
        }

        let id = commit_id(&root, &parents, message)?;
        let commit = Commit {
            id: id.clone(),
            parents,
            message: message.to_string(),
            committed_at: unix_now(),
            root: root.clone(),
        };

        self.commits.insert(id.clone(), commit);
        self.branches.insert(self.head.clone(), id.clone());
        self.working = root;
        self.merge_state = None;
        Ok(id)
    }

    // --- merging

    /// Three-way merge of `reference` into the current head.
    pub fn merge(&mut self, reference: &str) -> Result<RepoMergeReport, InternalError> {
        if self.working.has_violations() {
            let tables = self.working.violation_tables().join(", ");
            return Err(InternalError::constraint_violation(
                ErrorOrigin::Merge,
                format!(
                    "active merge has unresolved constraint violations in {tables}; drain the sidecars before merging again"
                ),
            ));
        }
        if self.working.has_conflicts() {
            return Err(InternalError::new(
                ErrorClass::Conflict,
                ErrorOrigin::Merge,
                "active merge has unresolved conflicts; resolve them before merging again",
            ));
        }
        if self.is_working_dirty()? {
            return Err(InternalError::new(
                ErrorClass::Conflict,
                ErrorOrigin::Merge,
                "working set has uncommitted changes; commit them before merging",
            ));
        }

        let head = self.head_commit()?.clone();
        let theirs = self.resolve(reference)?.clone();

        if head.id == theirs.id || self.is_ancestor(&theirs.id, &head.id)? {
            return Ok(RepoMergeReport {
                outcome: MergeOutcome::Clean,
                fast_forward: false,
                already_up_to_date: true,
                violations: 0,
                conflicts: 0,
            });
        }

        // Fast-forward: no new state is synthesized and validation is
        // skipped; sidecars carried by the target commit are preserved.
        if self.is_ancestor(&head.id, &theirs.id)? {
            self.branches.insert(self.head.clone(), theirs.id.clone());
            self.working = theirs.root.clone();
            self.merge_state = None;
            record(MetricsEvent::MergeFinish {
                outcome: MergeOutcomeKind::FastForward,
            });
            return Ok(RepoMergeReport {
                outcome: MergeOutcome::Clean,
                fast_forward: true,
                already_up_to_date: false,
                violations: 0,
                conflicts: 0,
            });
        }

        let base_id = self.merge_base(&head.id, &theirs.id)?;
        let base = self.try_commit(&base_id)?;

        let report = merge_roots(&base.root, &head.root, &theirs.root)?;

        // Publication point: one assignment makes the merged root and its
        // sidecars visible together; every failure path above leaves the
        // previous working state untouched.
        self.working = report.merged;
        self.merge_state = Some(MergeState {
            from_ref: reference.to_string(),
            from_commit: theirs.id,
            violation_tables: self.working.violation_tables(),
            conflict_tables: self
                .working
                .conflicts()
                .keys()
                .cloned()
                .collect(),
        });

        Ok(RepoMergeReport {
            outcome: report.outcome,
            fast_forward: false,
            already_up_to_date: false,
            violations: report.violations,
            conflicts: report.conflicts,
        })
    }

    fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> Result<bool, InternalError> {
        let mut queue = VecDeque::from([descendant.clone()]);
        let mut seen = BTreeSet::new();

        while let Some(id) = queue.pop_front() {
            if &id == ancestor {
                return Ok(true);
            }
            if !seen.insert(id.clone()) {
                continue;
            }
            queue.extend(self.try_commit(&id)?.parents.iter().cloned());
        }
        Ok(false)
    }

    /// Nearest common ancestor by breadth-first generation order.
    fn merge_base(&self, ours: &CommitId, theirs: &CommitId) -> Result<CommitId, InternalError> {
        let mut our_ancestors = BTreeSet::new();
        let mut queue = VecDeque::from([ours.clone()]);
        while let Some(id) = queue.pop_front() {
            if our_ancestors.insert(id.clone()) {
                queue.extend(self.try_commit(&id)?.parents.iter().cloned());
            }
        }

        let mut queue = VecDeque::from([theirs.clone()]);
        let mut seen = BTreeSet::new();
        while let Some(id) = queue.pop_front() {
            if our_ancestors.contains(&id) {
                return Ok(id);
            }
            if seen.insert(id.clone()) {
                queue.extend(self.try_commit(&id)?.parents.iter().cloned());
            }
        }

        Err(InternalError::new(
            ErrorClass::Unsupported,
            ErrorOrigin::Repo,
            "refs share no common ancestor",
        ))
    }

    // --- status and verification

    pub fn status(&self) -> Result<StatusReport, InternalError> {
        let head = self.head_commit()?;
        let merge_tables = self
            .merge_state
            .as_ref()
            .map(|state| state.violation_tables.clone())
            .unwrap_or_default();
        Ok(status(&head.root, &self.working, &merge_tables))
    }

    pub fn verify(&mut self, opts: &VerifyOptions) -> Result<VerifyReport, InternalError> {
        let head_root = self.head_commit()?.root.clone();
        verify_constraints(&head_root, &mut self.working, opts)
    }

    // --- working-set authoring

    pub fn create_table(&mut self, schema: TableSchema) -> Result<(), InternalError> {
        self.working.create_table(schema)
    }

    /// Replace a table's schema, re-projecting its rows into the new
    /// layout (dropped columns vanish, added columns fill with NULL).
    pub fn alter_table(&mut self, schema: TableSchema) -> Result<(), InternalError> {
        let current = self.working.try_table(schema.name())?;
        let projected = current.project_to(&schema)?;
        self.working.put_table(projected);
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> Result<(), InternalError> {
        match self.working.drop_table(name) {
            Some(_) => Ok(()),
            None => Err(InternalError::not_found(
                ErrorOrigin::Store,
                format!("table '{name}' not found"),
            )),
        }
    }

    /// Insert or replace one row, honoring write-time checks.
    ///
    /// With `foreign_key_checks=1` the write is rejected outright on a
    /// dangling reference or a unique collision; reification is a merge
    /// and verify concern only. With checks off the write lands and any
    /// latent violation surfaces at the next merge or verify.
    pub fn put_row(&mut self, table: &str, values: Vec<Value>) -> Result<TupleKey, InternalError> {
        if self.session.foreign_key_checks {
            self.check_write_references(table, &values)?;
        }
        self.check_write_unique(table, &values)?;
        self.working.try_table_mut(table)?.put(values)
    }

    /// Delete one row, honoring write-time checks.
    ///
    /// Keyed tables take the primary-key values; keyless tables take the
    /// full row tuple and delete one matching duplicate.
    pub fn delete_row(&mut self, table: &str, key_values: Vec<Value>) -> Result<(), InternalError> {
        let data = self.working.try_table(table)?;
        let key = if data.schema().is_keyless() {
            data.key_of(&key_values)?
        } else {
            TupleKey::try_new(key_values)?
        };

        if self.session.foreign_key_checks {
            self.check_delete_references(table, &key)?;
        }

        match self.working.try_table_mut(table)?.remove(&key) {
            Some(_) => Ok(()),
            None => Err(InternalError::not_found(
                ErrorOrigin::Store,
                format!("no row {key} in table '{table}'"),
            )),
        }
    }

    // Child-side write check: referring values must resolve in the
    // working parent index.
    fn check_write_references(&self, table: &str, values: &[Value]) -> Result<(), InternalError> {
        let schema = self.working.try_table(table)?.schema();

        for fk in schema.foreign_keys() {
            let Some(parent) = self.working.table(fk.referenced_table()) else {
                continue;
            };
            let Some(referring) = index_key_for_columns(schema, values, fk.columns()) else {
                continue;
            };
            let parent_index = IndexMap::build(parent, fk.referenced_columns())?;
            if !parent_index.contains(&referring) {
                return Err(InternalError::constraint_violation(
                    ErrorOrigin::Store,
                    format!(
                        "cannot write to '{table}': foreign key '{}' has no parent row for the referenced values",
                        fk.name()
                    ),
                ));
            }
        }

        Ok(())
    }

    // Unique write check: a second non-NULL carrier of a unique key is
    // rejected regardless of `foreign_key_checks`.
    fn check_write_unique(&self, table: &str, values: &[Value]) -> Result<(), InternalError> {
        let data = self.working.try_table(table)?;
        let schema = data.schema();
        let new_key = data.key_of(values)?;

        for index in schema.indexes().iter().filter(|index| index.unique()) {
            let Some(index_key) = index_key_for_columns(schema, values, index.columns()) else {
                continue;
            };
            let index_map = IndexMap::build(data, index.columns())?;
            let collides = index_map
                .rows_for(&index_key)
                .is_some_and(|rows| rows.iter().any(|existing| existing != &new_key));
            if collides {
                return Err(InternalError::constraint_violation(
                    ErrorOrigin::Store,
                    format!(
                        "cannot write to '{table}': unique index '{}' already carries the value",
                        index.name()
                    ),
                ));
            }
        }

        Ok(())
    }

    // Parent-side delete check. Declared referential actions are merge
    // metadata; the write path always restricts (cascade execution is
    // the SQL layer's concern).
    fn check_delete_references(&self, table: &str, key: &TupleKey) -> Result<(), InternalError> {
        let parent = self.working.try_table(table)?;
        let Some(row) = parent.get(key) else {
            return Ok(());
        };

        for (child_name, child) in self.working.tables() {
            for fk in child.schema().foreign_keys() {
                if fk.referenced_table() != table {
                    continue;
                }
                let Some(departed) =
                    index_key_for_columns(parent.schema(), row.values(), fk.referenced_columns())
                else {
                    continue;
                };

                let parent_index = IndexMap::build(parent, fk.referenced_columns())?;
                let survivors = parent_index
                    .rows_for(&departed)
                    .is_some_and(|rows| rows.iter().any(|existing| existing != key));
                if survivors {
                    continue;
                }

                let child_index = IndexMap::build(child, fk.columns())?;
                let referenced = child_index
                    .rows_for(&departed)
                    .is_some_and(|rows| !rows.is_empty());
                // A self-referential row may reference itself; deleting it
                // removes referrer and referent together.
                let self_only = child_name == table
                    && child_index
                        .rows_for(&departed)
                        .is_some_and(|rows| rows.len() == 1 && rows.contains(key));
                if referenced && !self_only {
                    return Err(InternalError::constraint_violation(
                        ErrorOrigin::Store,
                        format!(
                            "cannot delete from '{table}': rows in '{child_name}' reference it through foreign key '{}'",
                            fk.name()
                        ),
                    ));
                }
            }
        }

        Ok(())
    }
}

// Small lookup helper so commit-map misses classify uniformly.
trait CommitLookup {
    fn ok_or_commit(&self, id: &CommitId) -> Result<&Commit, InternalError>;
}

impl CommitLookup for BTreeMap<CommitId, Commit> {
    fn ok_or_commit(&self, id: &CommitId) -> Result<&Commit, InternalError> {
        self.get(id).ok_or_else(|| {
            InternalError::corruption(
                ErrorOrigin::Repo,
                format!("commit '{}' is missing from the graph", id.short()),
            )
        })
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        merge::MergeOutcome,
        schema::ReferentialAction,
        test_fixtures::{child_schema, key, pk_v1_schema, put_pairs, repo_with_tables, uint},
    };

    #[test]
    fn init_starts_on_main_with_an_empty_root_commit() {
        let repo = Repository::init().unwrap();
        assert_eq!(repo.head_branch(), DEFAULT_BRANCH);
        assert!(repo.head_commit().unwrap().parents.is_empty());
        assert!(!repo.is_working_dirty().unwrap());
    }

    #[test]
    fn checkout_refuses_to_discard_uncommitted_work() {
        let mut repo = repo_with_tables(vec![pk_v1_schema("t", false)]);
        repo.create_branch("side").unwrap();
        put_pairs(&mut repo, "t", &[(1, Some(1))]);

        let err = repo.checkout("side").unwrap_err();
        assert!(err.message.contains("uncommitted"));

        repo.commit("row", false).unwrap();
        repo.checkout("side").unwrap();
        assert!(repo.working().table("t").unwrap().is_empty());
    }

    #[test]
    fn refs_resolve_by_branch_name_and_id_prefix() {
        let mut repo = repo_with_tables(vec![pk_v1_schema("t", false)]);
        let id = repo.commit("empty", false).unwrap();

        assert_eq!(repo.resolve(DEFAULT_BRANCH).unwrap().id, id);
        assert_eq!(repo.resolve(id.short()).unwrap().id, id);
        assert!(repo.resolve("no-such-ref").unwrap_err().is_not_found());
    }

    #[test]
    fn log_walks_first_parents_newest_first() {
        let mut repo = repo_with_tables(vec![pk_v1_schema("t", false)]);
        put_pairs(&mut repo, "t", &[(1, Some(1))]);
        repo.commit("one", false).unwrap();
        put_pairs(&mut repo, "t", &[(2, Some(2))]);
        let newest = repo.commit("two", false).unwrap();

        let log = repo.log().unwrap();
        assert_eq!(log[0].id, newest);
        assert_eq!(log.last().unwrap().message, "initialize repository");
    }

    #[test]
    fn merge_commits_record_both_parents() {
        let mut repo = repo_with_tables(vec![pk_v1_schema("t", false)]);
        repo.commit("seed", false).unwrap();
        repo.create_branch("other").unwrap();

        put_pairs(&mut repo, "t", &[(1, Some(1))]);
        repo.commit("ours", false).unwrap();
        repo.checkout("other").unwrap();
        put_pairs(&mut repo, "t", &[(2, Some(2))]);
        let their_tip = repo.commit("theirs", false).unwrap();
        repo.checkout(DEFAULT_BRANCH).unwrap();

        let report = repo.merge("other").unwrap();
        assert_eq!(report.outcome, MergeOutcome::Clean);
        assert!(!report.fast_forward);

        let merge_commit = repo.commit("merge other", false).unwrap();
        let parents = &repo.resolve(merge_commit.as_str()).unwrap().parents;
        assert_eq!(parents.len(), 2);
        assert_eq!(parents[1], their_tip);

        // Merging the same ref again is a no-op.
        assert!(repo.merge("other").unwrap().already_up_to_date);
    }

    #[test]
    fn fast_forward_preserves_carried_sidecars() {
        let mut repo = repo_with_tables(vec![
            pk_v1_schema("parent", false),
            child_schema(
                "child",
                "parent",
                ReferentialAction::Restrict,
                ReferentialAction::Restrict,
            ),
        ]);
        put_pairs(&mut repo, "parent", &[(10, Some(1))]);
        repo.commit("seed", false).unwrap();

        // Author latent violations on a branch and force-commit them.
        repo.create_branch("other").unwrap();
        repo.checkout("other").unwrap();
        put_pairs(&mut repo, "child", &[(2, Some(2))]);
        let report = repo
            .verify(&crate::verify::VerifyOptions::default())
            .unwrap();
        assert_eq!(report.found, 1);
        assert!(repo.working().has_violations());

        repo.session_mut().force_transaction_commit = true;
        repo.commit("carry violations", true).unwrap();

        // Fast-forwarding main onto that commit preserves the sidecar.
        repo.checkout(DEFAULT_BRANCH).unwrap();
        let merged = repo.merge("other").unwrap();
        assert!(merged.fast_forward);
        assert!(repo.working().has_violations());
        assert_eq!(repo.working().sidecar("child").unwrap().len(), 1);

        let status = repo.status().unwrap();
        assert_eq!(status.notes.len(), 1);
        assert_eq!(
            status.notes[0].status.to_string(),
            "fix constraint violations"
        );
    }

    #[test]
    fn write_time_fk_checks_reject_dangling_references() {
        let mut repo = Repository::init().unwrap();
        repo.create_table(pk_v1_schema("parent", false)).unwrap();
        repo.create_table(child_schema(
            "parent_of_none",
            "parent",
            ReferentialAction::Restrict,
            ReferentialAction::Restrict,
        ))
        .unwrap();

        // Checks are on by default: the dangling write is rejected
        // outright, never reified.
        let err = repo
            .put_row("parent_of_none", vec![uint(1), crate::value::Value::Int(5)])
            .unwrap_err();
        assert!(err.is_constraint_violation());
        assert!(repo.working().sidecar("parent_of_none").is_none());

        // With a parent present the same write lands.
        repo.put_row("parent", vec![uint(10), crate::value::Value::Int(5)])
            .unwrap();
        repo.put_row("parent_of_none", vec![uint(1), crate::value::Value::Int(5)])
            .unwrap();

        // Deleting the referenced parent row is restricted.
        let err = repo.delete_row("parent", vec![uint(10)]).unwrap_err();
        assert!(err.is_constraint_violation());

        // With checks off the same writes land silently.
        repo.session_mut().foreign_key_checks = false;
        repo.delete_row("parent", vec![uint(10)]).unwrap();
    }

    #[test]
    fn write_time_unique_checks_hold_regardless_of_fk_setting() {
        let mut repo = Repository::init().unwrap();
        repo.session_mut().foreign_key_checks = false;
        repo.create_table(pk_v1_schema("t", true)).unwrap();

        put_pairs(&mut repo, "t", &[(1, Some(7))]);
        let err = repo
            .put_row("t", vec![uint(2), crate::value::Value::Int(7)])
            .unwrap_err();
        assert!(err.is_constraint_violation());

        // NULL never collides.
        put_pairs(&mut repo, "t", &[(2, None), (3, None)]);
    }

    #[test]
    fn verify_is_idempotent_and_scoped_to_rows_touched_since_head() {
        let mut repo = repo_with_tables(vec![
            pk_v1_schema("parent", false),
            child_schema(
                "child",
                "parent",
                ReferentialAction::Restrict,
                ReferentialAction::Restrict,
            ),
        ]);
        put_pairs(&mut repo, "parent", &[(10, Some(1))]);
        repo.commit("seed", false).unwrap();

        put_pairs(&mut repo, "child", &[(2, Some(2))]);

        let first = repo
            .verify(&crate::verify::VerifyOptions::default())
            .unwrap();
        assert_eq!(first.found, 1);
        assert_eq!(first.recorded, 1);

        // Re-running with no intervening writes changes nothing.
        let second = repo
            .verify(&crate::verify::VerifyOptions::default())
            .unwrap();
        assert_eq!(second.found, 1);
        assert_eq!(second.recorded, 0);
        assert_eq!(repo.working().sidecar("child").unwrap().len(), 1);
    }

    #[test]
    fn verify_output_only_persists_nothing() {
        let mut repo = repo_with_tables(vec![
            pk_v1_schema("parent", false),
            child_schema(
                "child",
                "parent",
                ReferentialAction::Restrict,
                ReferentialAction::Restrict,
            ),
        ]);
        repo.commit("seed", false).unwrap();
        put_pairs(&mut repo, "child", &[(2, Some(2))]);

        let opts = crate::verify::VerifyOptions {
            output_only: true,
            ..Default::default()
        };
        let report = repo.verify(&opts).unwrap();
        assert_eq!(report.found, 1);
        assert_eq!(report.recorded, 0);
        assert_eq!(report.summary.len(), 1);
        assert!(repo.working().sidecar("child").is_none());
    }

    #[test]
    fn drained_and_committed_sidecars_stay_empty_under_default_verify() {
        let mut repo = repo_with_tables(vec![
            pk_v1_schema("parent", false),
            child_schema(
                "child",
                "parent",
                ReferentialAction::Restrict,
                ReferentialAction::Restrict,
            ),
        ]);
        repo.commit("seed", false).unwrap();

        put_pairs(&mut repo, "child", &[(2, Some(2))]);
        repo.verify(&crate::verify::VerifyOptions::default())
            .unwrap();
        assert!(repo.working().has_violations());

        // Drain, commit, and re-verify: the default scope sees no
        // touched rows and the sidecar stays absent.
        repo.working_mut().delete_sidecar_rows("child");
        repo.commit("accept the dangling row", false).unwrap();

        let rerun = repo
            .verify(&crate::verify::VerifyOptions::default())
            .unwrap();
        assert_eq!(rerun.found, 0);
        assert!(repo.working().sidecar("child").is_none());

        // `--all` reconsiders every row and finds it again.
        let opts = crate::verify::VerifyOptions {
            all: true,
            ..Default::default()
        };
        let all = repo.verify(&opts).unwrap();
        assert_eq!(all.found, 1);
        assert_eq!(
            repo.working().sidecar("child").unwrap().rows()[0].key,
            key(2)
        );
    }

    #[test]
    fn repositories_round_trip_through_bytes() {
        let mut repo = repo_with_tables(vec![pk_v1_schema("t", false)]);
        put_pairs(&mut repo, "t", &[(1, Some(1))]);
        repo.commit("row", false).unwrap();

        let bytes = repo.to_bytes().unwrap();
        let restored = Repository::from_bytes(&bytes).unwrap();
        assert_eq!(repo, restored);
    }
}
