use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    hash::RowHash,
    schema::TableSchema,
    store::{Row, TupleKey},
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// TableData
///
/// One table's schema plus its ordered tuple map. The map is the only
/// row storage; secondary indexes are derived on demand from it so
/// every reader sees exactly the published state.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableData {
    schema: TableSchema,
    rows: BTreeMap<TupleKey, Row>,
}

impl TableData {
    #[must_use]
    pub const fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn schema(&self) -> &TableSchema {
        &self.schema
    }

    #[must_use]
    pub const fn rows(&self) -> &BTreeMap<TupleKey, Row> {
        &self.rows
    }

    #[must_use]
    pub fn get(&self, key: &TupleKey) -> Option<&Row> {
        self.rows.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Derive the tuple key for one row tuple under this schema.
    ///
    /// Keyed tables extract the primary-key components; keyless tables
    /// hash the normalized tuple into a surrogate.
    pub fn key_of(&self, values: &[Value]) -> Result<TupleKey, InternalError> {
        if self.schema.is_keyless() {
            let row = Row::new(values.to_vec());
            return Ok(TupleKey::surrogate(RowHash::of(&row.normalized_bytes())));
        }

        let mut components = Vec::with_capacity(self.schema.primary_key().len());
        for position in self.schema.key_positions() {
            let Some(value) = values.get(position) else {
                return Err(InternalError::new(
                    ErrorClass::InvariantViolation,
                    ErrorOrigin::Store,
                    format!(
                        "row for table '{}' is missing primary-key column {position}",
                        self.schema.name()
                    ),
                ));
            };
            components.push(value.clone());
        }

        TupleKey::try_new(components)
    }

    /// Insert or replace one row tuple, returning its key.
    ///
    /// Keyless tables fold duplicate tuples by bumping cardinality.
    pub fn put(&mut self, values: Vec<Value>) -> Result<TupleKey, InternalError> {
        self.schema.check_row(&values)?;
        let key = self.key_of(&values)?;

        if self.schema.is_keyless() {
            if let Some(existing) = self.rows.get_mut(&key) {
                *existing = Row::with_cardinality(
                    existing.values().to_vec(),
                    existing.cardinality().saturating_add(1),
                );
                return Ok(key);
            }
        }

        self.rows.insert(key.clone(), Row::new(values));
        Ok(key)
    }

    /// Remove one row (or one keyless duplicate) by key.
    pub fn remove(&mut self, key: &TupleKey) -> Option<Row> {
        if self.schema.is_keyless() {
            if let Some(existing) = self.rows.get_mut(key) {
                if existing.cardinality() > 1 {
                    let decremented = Row::with_cardinality(
                        existing.values().to_vec(),
                        existing.cardinality() - 1,
                    );
                    return self.rows.insert(key.clone(), decremented);
                }
            }
        }
        self.rows.remove(key)
    }

    pub(crate) fn insert_raw(&mut self, key: TupleKey, row: Row) {
        self.rows.insert(key, row);
    }

    /// Remove one map entry wholesale, keyless cardinality included.
    pub(crate) fn remove_entry(&mut self, key: &TupleKey) -> Option<Row> {
        self.rows.remove(key)
    }

    pub(crate) fn replace_rows(&mut self, rows: BTreeMap<TupleKey, Row>) {
        self.rows = rows;
    }

    /// Re-project every row into a target schema's column layout.
    ///
    /// Columns are matched by name; columns absent from this schema fill
    /// with NULL. Keys are re-derived because key positions may move.
    pub fn project_to(&self, target: &TableSchema) -> Result<Self, InternalError> {
        if target == &self.schema {
            let mut out = Self::new(target.clone());
            out.rows = self.rows.clone();
            return Ok(out);
        }

        let positions: Vec<Option<usize>> = target
            .columns()
            .iter()
            .map(|column| self.schema.column_position(&column.name))
            .collect();

        let mut out = Self::new(target.clone());
        for row in self.rows.values() {
            let values: Vec<Value> = positions
                .iter()
                .map(|source| {
                    source.map_or(Value::Null, |position| {
                        row.value(position).cloned().unwrap_or(Value::Null)
                    })
                })
                .collect();

            let key = out.key_of(&values)?;
            out.insert_raw(key, Row::with_cardinality(values, row.cardinality()));
        }

        Ok(out)
    }
}
