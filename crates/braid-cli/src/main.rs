//! `braid` — command-line front end for Braid repositories.
//!
//! Exit codes follow the merge-engine contract: 0 for success (a merge
//! that populates sidecars still exits 0, with the "fix constraint
//! violations" message), 1 for refused operations and for verify runs
//! that find violations.

mod commands;
mod defs;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "braid", version, about = "A branch-and-merge versioned relational store")]
struct Cli {
    /// Path of the repository file.
    #[arg(long, global = true, default_value = ".braid", env = "BRAID_REPO")]
    repo: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an empty repository.
    Init,
    /// Create a branch at the current head, or list branches.
    Branch { name: Option<String> },
    /// Switch the working set to another branch.
    Checkout { name: String },
    /// Show the commit history of the current head.
    Log,
    /// Show working-set changes and constraint status.
    Status,
    /// Show the working set's per-table storage footprint.
    Report,
    /// Three-way merge of a ref into the current head.
    Merge { reference: String },
    /// Commit the working set.
    Commit {
        #[arg(short, long)]
        message: String,
        /// Bypass the violation gate (requires
        /// braid_force_transaction_commit=1).
        #[arg(long)]
        force: bool,
    },
    /// Constraint tooling.
    Constraints {
        #[command(subcommand)]
        command: ConstraintsCommand,
    },
    /// Inspect or drain violation sidecars.
    Violations {
        #[command(subcommand)]
        command: ViolationsCommand,
    },
    /// Inspect or drain conflict ledgers.
    Conflicts {
        #[command(subcommand)]
        command: ConflictsCommand,
    },
    /// Create tables and edit rows.
    Table {
        #[command(subcommand)]
        command: TableCommand,
    },
    /// Read or write session settings.
    Config {
        name: String,
        value: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConstraintsCommand {
    /// Re-derive constraint violations against HEAD.
    Verify {
        /// Reconsider every row, not just rows touched since HEAD.
        #[arg(long)]
        all: bool,
        /// Report without persisting sidecars.
        #[arg(long)]
        output_only: bool,
        /// Restrict verification to these tables.
        tables: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ViolationsCommand {
    /// Print the summary, or one table's sidecar rows.
    Show { table: Option<String> },
    /// Delete every sidecar row recorded for a table.
    Clear { table: String },
}

#[derive(Subcommand)]
enum ConflictsCommand {
    /// Print conflicted tables, or one table's conflict rows.
    Show { table: Option<String> },
    /// Delete every recorded conflict for a table.
    Clear { table: String },
}

#[derive(Subcommand)]
enum TableCommand {
    /// Create a table: `braid table create t pk:uint v1:int:null --pk pk`.
    Create {
        name: String,
        /// Column definitions, `name:type[:null]`.
        columns: Vec<String>,
        /// Primary-key column names; omit them all for a keyless table.
        #[arg(long = "pk")]
        primary_key: Vec<String>,
        /// Secondary indexes, `name=col[,col…]`.
        #[arg(long)]
        index: Vec<String>,
        /// Unique indexes, `name=col[,col…]`.
        #[arg(long)]
        unique: Vec<String>,
        /// Foreign keys,
        /// `name=cols@index->table(cols)@index[;on_delete[;on_update]]`.
        #[arg(long)]
        fk: Vec<String>,
    },
    /// Insert or replace one row.
    Put { table: String, values: Vec<String> },
    /// Delete one row by primary-key values (full tuple for keyless).
    Del { table: String, values: Vec<String> },
    /// Print a table's rows.
    Show { table: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Init => commands::init(&cli.repo),
        Command::Branch { name } => commands::branch(&cli.repo, name.as_deref()),
        Command::Checkout { name } => commands::checkout(&cli.repo, &name),
        Command::Log => commands::log(&cli.repo),
        Command::Status => commands::status(&cli.repo),
        Command::Report => commands::report(&cli.repo),
        Command::Merge { reference } => commands::merge(&cli.repo, &reference),
        Command::Commit { message, force } => commands::commit(&cli.repo, &message, force),
        Command::Constraints {
            command: ConstraintsCommand::Verify {
                all,
                output_only,
                tables,
            },
        } => commands::verify(&cli.repo, all, output_only, tables),
        Command::Violations { command } => match command {
            ViolationsCommand::Show { table } => {
                commands::violations_show(&cli.repo, table.as_deref())
            }
            ViolationsCommand::Clear { table } => commands::violations_clear(&cli.repo, &table),
        },
        Command::Conflicts { command } => match command {
            ConflictsCommand::Show { table } => {
                commands::conflicts_show(&cli.repo, table.as_deref())
            }
            ConflictsCommand::Clear { table } => commands::conflicts_clear(&cli.repo, &table),
        },
        Command::Table { command } => match command {
            TableCommand::Create {
                name,
                columns,
                primary_key,
                index,
                unique,
                fk,
            } => commands::table_create(&cli.repo, &name, &columns, &primary_key, &index, &unique, &fk),
            TableCommand::Put { table, values } => commands::table_put(&cli.repo, &table, &values),
            TableCommand::Del { table, values } => commands::table_del(&cli.repo, &table, &values),
            TableCommand::Show { table } => commands::table_show(&cli.repo, &table),
        },
        Command::Config { name, value } => commands::config(&cli.repo, &name, value.as_deref()),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
