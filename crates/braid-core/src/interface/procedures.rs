//! Stored-procedure twins of the CLI verbs.
//!
//! `BRAID_MERGE`, `BRAID_COMMIT`, `BRAID_VERIFY_CONSTRAINTS`, and
//! `BRAID_VERIFY_ALL_CONSTRAINTS` behave exactly like their commands and
//! reduce every result to an integer code: 0 for success with nothing to
//! fix, 1 otherwise. Messages carry the human-readable detail.


use crate::{
    merge::MergeOutcome,
    repo::Repository,
    verify::VerifyOptions,
};

///
/// ProcedureOutcome
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcedureOutcome {
    pub code: i64,
    pub message: String,
}

impl ProcedureOutcome {
    const fn ok(message: String) -> Self {
        Self { code: 0, message }
    }

    const fn fix(message: String) -> Self {
        Self { code: 1, message }
    }
}

/// `BRAID_MERGE(<ref>)`
pub fn braid_merge(repo: &mut Repository, reference: &str) -> ProcedureOutcome {
    match repo.merge(reference) {
        Ok(report) => {
            if report.already_up_to_date {
                ProcedureOutcome::ok("already up to date".to_string())
            } else if report.fast_forward {
                ProcedureOutcome::ok("fast-forward".to_string())
            } else {
                match report.outcome {
                    MergeOutcome::Clean => ProcedureOutcome::ok("merge complete".to_string()),
                    MergeOutcome::Violations => {
                        ProcedureOutcome::fix("fix constraint violations".to_string())
                    }
                    MergeOutcome::Conflicts => {
                        ProcedureOutcome::fix("merge produced conflicts".to_string())
                    }
                }
            }
        }
        Err(err) => ProcedureOutcome::fix(err.to_string()),
    }
}

/// `BRAID_COMMIT(<message>[, force])`
pub fn braid_commit(repo: &mut Repository, message: &str, force: bool) -> ProcedureOutcome {
    match repo.commit(message, force) {
        Ok(id) => ProcedureOutcome::ok(format!("committed {}", id.short())),
        Err(err) => ProcedureOutcome::fix(err.to_string()),
    }
}

/// `BRAID_VERIFY_CONSTRAINTS([tables…])`
pub fn braid_verify_constraints(repo: &mut Repository, tables: &[String]) -> ProcedureOutcome {
    run_verify(repo, tables, false)
}

/// `BRAID_VERIFY_ALL_CONSTRAINTS([tables…])`
pub fn braid_verify_all_constraints(repo: &mut Repository, tables: &[String]) -> ProcedureOutcome {
    run_verify(repo, tables, true)
}

fn run_verify(repo: &mut Repository, tables: &[String], all: bool) -> ProcedureOutcome {
    let opts = VerifyOptions {
        all,
        output_only: false,
        tables: tables.to_vec(),
    };
    match repo.verify(&opts) {
        Ok(report) if report.any_found() => {
            ProcedureOutcome::fix(format!("{} constraint violations found", report.found))
        }
        Ok(_) => ProcedureOutcome::ok("no constraint violations".to_string()),
        Err(err) => ProcedureOutcome::fix(err.to_string()),
    }
}
