//! Outward-facing call surfaces.

pub mod procedures;

pub use procedures::{
    ProcedureOutcome, braid_commit, braid_merge, braid_verify_all_constraints,
    braid_verify_constraints,
};
