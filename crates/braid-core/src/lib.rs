//! Core runtime for Braid: the three-way merge engine of a
//! branch-and-merge versioned relational store, with every constraint
//! violation reified as durable, queryable sidecar data.
#![warn(unreachable_pub)]

// 1️⃣ Engine modules
pub mod commit;
pub mod conflict;
pub mod merge;
pub mod repo;
pub mod verify;
pub mod violation;

// 2️⃣ Foundation modules
pub mod error;
pub mod hash;
pub mod obs;
pub mod schema;
pub mod serialize;
pub mod session;
pub mod store;
pub mod value;

// 3️⃣ Call surfaces
pub mod interface;

#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Domain vocabulary only. No errors, sinks, serializers, or helpers
/// are re-exported here.
///

pub mod prelude {
    pub use crate::{
        merge::{EditOp, EditOrigin, MergeOutcome, RowEdit},
        repo::Repository,
        schema::{
            Column, ColumnType, ForeignKey, IndexSchema, PRIMARY_INDEX, ReferentialAction,
            TableSchema,
        },
        session::SessionConfig,
        store::{Root, Row, TableData, TupleKey},
        value::Value,
        violation::{SIDECAR_PREFIX, SUMMARY_TABLE, ViolationKind},
    };
}
