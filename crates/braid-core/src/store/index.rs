use crate::{
    error::{ErrorOrigin, InternalError},
    store::{TableData, TupleKey},
    value::Value,
};
use derive_more::Deref;
use std::collections::{BTreeMap, BTreeSet};

///
/// IndexMap
///
/// Derived secondary index over one column list of one table's merged
/// state: index key values to the set of row keys carrying them. Rows
/// with NULL in any indexed column take no entry, which implements the
/// NULL exemption for both unique and foreign-key checks.
///

#[derive(Clone, Debug, Default, Deref)]
pub struct IndexMap(BTreeMap<Vec<Value>, BTreeSet<TupleKey>>);

impl IndexMap {
    /// Build the index for `columns` from a table's current rows.
    pub fn build(table: &TableData, columns: &[String]) -> Result<Self, InternalError> {
        let mut positions = Vec::with_capacity(columns.len());
        for column in columns {
            let Some(position) = table.schema().column_position(column) else {
                return Err(InternalError::corruption(
                    ErrorOrigin::Index,
                    format!(
                        "index column '{column}' is missing from table '{}'",
                        table.schema().name()
                    ),
                ));
            };
            positions.push(position);
        }

        let mut entries: BTreeMap<Vec<Value>, BTreeSet<TupleKey>> = BTreeMap::new();
        for (key, row) in table.rows() {
            if let Some(index_key) = index_key_from(row.values(), &positions) {
                entries.entry(index_key).or_default().insert(key.clone());
            }
        }

        Ok(Self(entries))
    }

    /// Row keys currently carrying one index key.
    #[must_use]
    pub fn rows_for(&self, index_key: &[Value]) -> Option<&BTreeSet<TupleKey>> {
        self.0.get(index_key)
    }

    #[must_use]
    pub fn contains(&self, index_key: &[Value]) -> bool {
        self.0.contains_key(index_key)
    }

    /// Iterate entries whose key is carried by two or more rows.
    pub fn collisions(&self) -> impl Iterator<Item = (&Vec<Value>, &BTreeSet<TupleKey>)> {
        self.0.iter().filter(|(_, rows)| rows.len() >= 2)
    }
}

/// Extract the index-key values at `positions`, or `None` when any
/// component is NULL.
#[must_use]
pub fn index_key_from(values: &[Value], positions: &[usize]) -> Option<Vec<Value>> {
    let mut out = Vec::with_capacity(positions.len());
    for &position in positions {
        match values.get(position) {
            Some(value) if !value.is_null() => out.push(value.clone()),
            _ => return None,
        }
    }
    Some(out)
}

/// Extract the index-key values for named columns under a schema.
#[must_use]
pub fn index_key_for_columns(
    schema: &crate::schema::TableSchema,
    values: &[Value],
    columns: &[String],
) -> Option<Vec<Value>> {
    let positions: Option<Vec<usize>> = columns
        .iter()
        .map(|column| schema.column_position(column))
        .collect();
    index_key_from(values, &positions?)
}
