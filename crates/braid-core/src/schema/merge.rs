//! Three-way table-schema merge.
//!
//! Contract:
//! - schemas merge before any row data, and the merged schema fixes the
//!   column layout the data merger projects into
//! - foreign-key and index sets are the per-name three-way union, drops
//!   honored
//! - incompatible changes (both sides editing one facet differently) are
//!   fatal; nothing is published on a fatal outcome

use crate::{
    error::InternalError,
    schema::{Column, ForeignKey, IndexSchema, TableSchema},
};
use std::collections::BTreeSet;

// Per-name three-way merge of one schema facet.
//
// Returns the surviving definition, or `Incompatible` when both sides
// changed it in different directions.
fn three_way<'a, T: PartialEq>(
    base: Option<&'a T>,
    ours: Option<&'a T>,
    theirs: Option<&'a T>,
) -> Result<Option<&'a T>, ()> {
    if ours == theirs {
        return Ok(ours);
    }
    if theirs == base {
        return Ok(ours);
    }
    if ours == base {
        return Ok(theirs);
    }
    Err(())
}

// Ordered union of facet names: ours order first, then theirs-only names.
fn name_union(ours: &[String], theirs: &[String]) -> Vec<String> {
    let mut names: Vec<String> = ours.to_vec();
    let seen: BTreeSet<&String> = ours.iter().collect();
    for name in theirs {
        if !seen.contains(name) {
            names.push(name.clone());
        }
    }
    names
}

fn merge_columns(
    table: &str,
    base: Option<&TableSchema>,
    ours: &TableSchema,
    theirs: &TableSchema,
) -> Result<Vec<Column>, InternalError> {
    let our_names: Vec<String> = ours.columns().iter().map(|c| c.name.clone()).collect();
    let their_names: Vec<String> = theirs.columns().iter().map(|c| c.name.clone()).collect();

    let mut merged = Vec::new();
    for name in name_union(&our_names, &their_names) {
        let survivor = three_way(
            base.and_then(|schema| schema.column(&name)),
            ours.column(&name),
            theirs.column(&name),
        )
        .map_err(|()| {
            InternalError::schema_incompatible(format!(
                "table '{table}' column '{name}' changed incompatibly on both sides"
            ))
        })?;

        if let Some(column) = survivor {
            merged.push(column.clone());
        }
    }

    Ok(merged)
}

fn merge_primary_key(
    table: &str,
    base: Option<&TableSchema>,
    ours: &TableSchema,
    theirs: &TableSchema,
) -> Result<Vec<String>, InternalError> {
    if ours.primary_key() == theirs.primary_key() {
        return Ok(ours.primary_key().to_vec());
    }
    let base_key = base.map(TableSchema::primary_key);
    if Some(theirs.primary_key()) == base_key {
        return Ok(ours.primary_key().to_vec());
    }
    if Some(ours.primary_key()) == base_key {
        return Ok(theirs.primary_key().to_vec());
    }
    Err(InternalError::schema_incompatible(format!(
        "table '{table}' primary key changed incompatibly on both sides"
    )))
}

fn merge_indexes(
    table: &str,
    base: Option<&TableSchema>,
    ours: &TableSchema,
    theirs: &TableSchema,
) -> Result<Vec<IndexSchema>, InternalError> {
    let our_names: Vec<String> = ours.indexes().iter().map(|i| i.name().to_string()).collect();
    let their_names: Vec<String> = theirs
        .indexes()
        .iter()
        .map(|i| i.name().to_string())
        .collect();

    let mut merged = Vec::new();
    for name in name_union(&our_names, &their_names) {
        let survivor = three_way(
            base.and_then(|schema| schema.index(&name)),
            ours.index(&name),
            theirs.index(&name),
        )
        .map_err(|()| {
            InternalError::schema_incompatible(format!(
                "table '{table}' index '{name}' changed incompatibly on both sides"
            ))
        })?;

        if let Some(index) = survivor {
            merged.push(index.clone());
        }
    }

    Ok(merged)
}

fn merge_foreign_keys(
    table: &str,
    base: Option<&TableSchema>,
    ours: &TableSchema,
    theirs: &TableSchema,
) -> Result<Vec<ForeignKey>, InternalError> {
    let find = |schema: &'_ TableSchema, name: &str| -> Option<ForeignKey> {
        schema
            .foreign_keys()
            .iter()
            .find(|fk| fk.name() == name)
            .cloned()
    };

    let our_names: Vec<String> = ours
        .foreign_keys()
        .iter()
        .map(|fk| fk.name().to_string())
        .collect();
    let their_names: Vec<String> = theirs
        .foreign_keys()
        .iter()
        .map(|fk| fk.name().to_string())
        .collect();

    let mut merged = Vec::new();
    for name in name_union(&our_names, &their_names) {
        let base_fk = base.and_then(|schema| find(schema, &name));
        let our_fk = find(ours, &name);
        let their_fk = find(theirs, &name);

        let survivor = three_way(base_fk.as_ref(), our_fk.as_ref(), their_fk.as_ref()).map_err(
            |()| {
                InternalError::schema_incompatible(format!(
                    "table '{table}' foreign key '{name}' changed incompatibly on both sides"
                ))
            },
        )?;

        if let Some(fk) = survivor {
            merged.push(fk.clone());
        }
    }

    Ok(merged)
}

/// Merge one table's schema across base, ours, and theirs.
///
/// `None` inputs model absence (table not present on that side); a `None`
/// output means the merged root drops the table. A table dropped on one
/// side while the other side changed its schema is fatal.
pub fn merge_table_schemas(
    table: &str,
    base: Option<&TableSchema>,
    ours: Option<&TableSchema>,
    theirs: Option<&TableSchema>,
) -> Result<Option<TableSchema>, InternalError> {
    let (our_schema, their_schema) = match (base, ours, theirs) {
        (_, None, None) => return Ok(None),

        // Added on exactly one side.
        (None, Some(added), None) | (None, None, Some(added)) => return Ok(Some(added.clone())),

        // Dropped on one side: honor the drop only when the surviving side
        // left the schema untouched.
        (Some(base_schema), None, Some(survivor)) | (Some(base_schema), Some(survivor), None) => {
            if survivor == base_schema {
                return Ok(None);
            }
            return Err(InternalError::schema_incompatible(format!(
                "table '{table}' was dropped on one side and altered on the other"
            )));
        }

        (_, Some(our_schema), Some(their_schema)) => (our_schema, their_schema),
    };

    if our_schema == their_schema {
        return Ok(Some(our_schema.clone()));
    }

    let columns = merge_columns(table, base, our_schema, their_schema)?;
    let primary_key = merge_primary_key(table, base, our_schema, their_schema)?;
    let indexes = merge_indexes(table, base, our_schema, their_schema)?;
    let foreign_keys = merge_foreign_keys(table, base, our_schema, their_schema)?;

    // Revalidation catches cross-facet fallout, e.g. an index surviving a
    // column drop.
    TableSchema::try_new(table, columns, primary_key, indexes, foreign_keys).map(Some)
}
