//! Command implementations over one repository file.
//!
//! Every command loads the repository, applies one operation, and (when
//! it mutated anything) writes the file back whole. The file is small
//! CBOR; atomicity beyond process-level is out of scope here.

use crate::defs;
use braid_core::{
    merge::MergeOutcome,
    repo::Repository,
    schema::TableSchema,
    verify::VerifyOptions,
    violation::SUMMARY_TABLE,
};
use std::error::Error;
use std::path::Path;
use std::process::ExitCode;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

type CmdResult = Result<ExitCode, Box<dyn Error>>;

fn load(path: &Path) -> Result<Repository, Box<dyn Error>> {
    let bytes = std::fs::read(path)
        .map_err(|err| format!("cannot read repository '{}': {err}", path.display()))?;
    Ok(Repository::from_bytes(&bytes)?)
}

fn store(path: &Path, repo: &Repository) -> Result<(), Box<dyn Error>> {
    std::fs::write(path, repo.to_bytes()?)
        .map_err(|err| format!("cannot write repository '{}': {err}", path.display()))?;
    Ok(())
}

pub fn init(path: &Path) -> CmdResult {
    if path.exists() {
        return Err(format!("repository '{}' already exists", path.display()).into());
    }
    let repo = Repository::init()?;
    store(path, &repo)?;
    println!("initialized empty repository at {}", path.display());
    Ok(ExitCode::SUCCESS)
}

pub fn branch(path: &Path, name: Option<&str>) -> CmdResult {
    let mut repo = load(path)?;
    match name {
        Some(name) => {
            repo.create_branch(name)?;
            store(path, &repo)?;
            println!("created branch {name}");
        }
        None => {
            for branch in repo.branch_names() {
                let marker = if branch == repo.head_branch() { "*" } else { " " };
                println!("{marker} {branch}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn checkout(path: &Path, name: &str) -> CmdResult {
    let mut repo = load(path)?;
    repo.checkout(name)?;
    store(path, &repo)?;
    println!("switched to branch {name}");
    Ok(ExitCode::SUCCESS)
}

pub fn log(path: &Path) -> CmdResult {
    let repo = load(path)?;
    for commit in repo.log()? {
        let when = OffsetDateTime::from_unix_timestamp(i64::try_from(commit.committed_at)?)
            .ok()
            .and_then(|stamp| stamp.format(&Rfc3339).ok())
            .unwrap_or_else(|| "unknown".to_string());
        println!("{} {} {}", commit.id.short(), when, commit.message);
    }
    Ok(ExitCode::SUCCESS)
}

pub fn status(path: &Path) -> CmdResult {
    let repo = load(path)?;
    let report = repo.status()?;

    println!("on branch {}", repo.head_branch());
    if report.is_clean() {
        println!("working set clean");
        return Ok(ExitCode::SUCCESS);
    }

    for change in &report.table_changes {
        match change {
            braid_core::commit::TableChange::Added(table) => println!("  added:    {table}"),
            braid_core::commit::TableChange::Dropped(table) => println!("  dropped:  {table}"),
            braid_core::commit::TableChange::Modified(table) => println!("  modified: {table}"),
        }
    }
    for note in &report.notes {
        println!("  {} ({})", note.status, note.table);
    }
    for table in &report.conflict_tables {
        println!("  unresolved conflicts ({table})");
    }
    Ok(ExitCode::SUCCESS)
}

pub fn report(path: &Path) -> CmdResult {
    let repo = load(path)?;
    let report = braid_core::obs::storage_report(repo.working());

    println!("table\trows\tviolations\tconflicts");
    for table in &report.tables {
        println!(
            "{}\t{}\t{}\t{}",
            table.table, table.rows, table.violations, table.conflicts
        );
    }
    println!(
        "total\t{}\t{}\t{}",
        report.total_rows, report.total_violations, report.total_conflicts
    );
    Ok(ExitCode::SUCCESS)
}

pub fn merge(path: &Path, reference: &str) -> CmdResult {
    let mut repo = load(path)?;
    let report = repo.merge(reference)?;
    store(path, &repo)?;

    if report.already_up_to_date {
        println!("already up to date");
        return Ok(ExitCode::SUCCESS);
    }
    if report.fast_forward {
        println!("fast-forward");
        return Ok(ExitCode::SUCCESS);
    }

    match report.outcome {
        MergeOutcome::Clean => println!("merge complete"),
        MergeOutcome::Violations => {
            // The merged state is applied; the sidecars hold the work
            // list and the commit gate is armed.
            println!("fix constraint violations");
            print_summary(&repo);
        }
        MergeOutcome::Conflicts => {
            println!("automatic merge failed; {} conflicts recorded", report.conflicts);
            if report.violations > 0 {
                println!("fix constraint violations");
                print_summary(&repo);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn commit(path: &Path, message: &str, force: bool) -> CmdResult {
    let mut repo = load(path)?;
    let id = repo.commit(message, force)?;
    store(path, &repo)?;
    println!("committed {}", id.short());
    Ok(ExitCode::SUCCESS)
}

pub fn verify(path: &Path, all: bool, output_only: bool, tables: Vec<String>) -> CmdResult {
    let mut repo = load(path)?;
    let opts = VerifyOptions {
        all,
        output_only,
        tables,
    };
    let report = repo.verify(&opts)?;
    if !output_only {
        store(path, &repo)?;
    }

    for row in &report.summary {
        println!("{}\t{}", row.table, row.num_violations);
    }
    if report.any_found() {
        println!("{} constraint violations found", report.found);
        return Ok(ExitCode::FAILURE);
    }
    println!("no constraint violations");
    Ok(ExitCode::SUCCESS)
}

fn print_summary(repo: &Repository) {
    for row in repo.working().violation_summary() {
        println!("  {}: {} ({})", SUMMARY_TABLE, row.table, row.num_violations);
    }
}

pub fn violations_show(path: &Path, table: Option<&str>) -> CmdResult {
    let repo = load(path)?;
    match table {
        None => {
            for row in repo.working().violation_summary() {
                println!("{}\t{}", row.table, row.num_violations);
            }
        }
        Some(table) => {
            let Some(sidecar) = repo.working().sidecar(table) else {
                return Ok(ExitCode::SUCCESS);
            };
            for violation in sidecar.rows() {
                let row = serde_json::json!({
                    "from_root_ish": violation.from_root_ish,
                    "violation_type": violation.kind.to_string(),
                    "key": violation.key.to_string(),
                    "row": violation
                        .row_values
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>(),
                    "violation_info": violation.info,
                });
                println!("{row}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn violations_clear(path: &Path, table: &str) -> CmdResult {
    let mut repo = load(path)?;
    let removed = repo.working_mut().delete_sidecar_rows(table);
    store(path, &repo)?;
    println!("deleted {removed} violation rows for {table}");
    Ok(ExitCode::SUCCESS)
}

pub fn conflicts_show(path: &Path, table: Option<&str>) -> CmdResult {
    let repo = load(path)?;
    match table {
        None => {
            for (name, ledger) in repo.working().conflicts() {
                println!("{name}\t{}", ledger.len());
            }
        }
        Some(table) => {
            let Some(ledger) = repo.working().conflict_ledger(table) else {
                return Ok(ExitCode::SUCCESS);
            };
            for conflict in ledger.rows() {
                let describe = |row: &Option<braid_core::store::Row>| {
                    row.as_ref().map(|row| {
                        row.values()
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                    })
                };
                let row = serde_json::json!({
                    "key": conflict.key.to_string(),
                    "base": describe(&conflict.base),
                    "ours": describe(&conflict.ours),
                    "theirs": describe(&conflict.theirs),
                });
                println!("{row}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn conflicts_clear(path: &Path, table: &str) -> CmdResult {
    let mut repo = load(path)?;
    let removed = repo.working_mut().delete_conflicts(table);
    store(path, &repo)?;
    println!("deleted {removed} conflict rows for {table}");
    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::too_many_arguments)]
pub fn table_create(
    path: &Path,
    name: &str,
    columns: &[String],
    primary_key: &[String],
    indexes: &[String],
    uniques: &[String],
    fks: &[String],
) -> CmdResult {
    let mut repo = load(path)?;

    let columns = columns
        .iter()
        .map(|def| defs::parse_column(def))
        .collect::<Result<Vec<_>, _>>()?;
    let mut index_schemas = indexes
        .iter()
        .map(|def| defs::parse_index(def, false))
        .collect::<Result<Vec<_>, _>>()?;
    index_schemas.extend(
        uniques
            .iter()
            .map(|def| defs::parse_index(def, true))
            .collect::<Result<Vec<_>, _>>()?,
    );
    let foreign_keys = fks
        .iter()
        .map(|def| defs::parse_fk(name, def))
        .collect::<Result<Vec<_>, _>>()?;

    let schema = TableSchema::try_new(
        name,
        columns,
        primary_key.to_vec(),
        index_schemas,
        foreign_keys,
    )?;
    repo.create_table(schema)?;
    store(path, &repo)?;
    println!("created table {name}");
    Ok(ExitCode::SUCCESS)
}

pub fn table_put(path: &Path, table: &str, values: &[String]) -> CmdResult {
    let mut repo = load(path)?;
    let schema = repo.working().try_table(table)?.schema().clone();
    let row = defs::parse_row(&schema, values)?;
    repo.put_row(table, row)?;
    store(path, &repo)?;
    Ok(ExitCode::SUCCESS)
}

pub fn table_del(path: &Path, table: &str, values: &[String]) -> CmdResult {
    let mut repo = load(path)?;
    let schema = repo.working().try_table(table)?.schema().clone();
    let key_values = defs::parse_key_values(&schema, values)?;
    repo.delete_row(table, key_values)?;
    store(path, &repo)?;
    Ok(ExitCode::SUCCESS)
}

pub fn table_show(path: &Path, table: &str) -> CmdResult {
    let repo = load(path)?;
    let data = repo.working().try_table(table)?;

    let header: Vec<&str> = data
        .schema()
        .columns()
        .iter()
        .map(|column| column.name.as_str())
        .collect();
    println!("{}", header.join("\t"));

    for row in data.rows().values() {
        let cells: Vec<String> = row.values().iter().map(ToString::to_string).collect();
        if data.schema().is_keyless() && row.cardinality() > 1 {
            println!("{}\t(x{})", cells.join("\t"), row.cardinality());
        } else {
            println!("{}", cells.join("\t"));
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn config(path: &Path, name: &str, value: Option<&str>) -> CmdResult {
    let mut repo = load(path)?;
    match value {
        Some(value) => {
            repo.session_mut().set(name, value)?;
            store(path, &repo)?;
            println!("{name} = {value}");
        }
        None => {
            println!("{name} = {}", repo.session().get(name)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}
