mod foreign_key;
mod index;
mod merge;


use crate::{
    error::{ErrorOrigin, InternalError},
    hash::fnv1a_64,
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub use foreign_key::{ForeignKey, ReferentialAction};
pub use index::IndexSchema;
pub use merge::merge_table_schemas;

/// Pseudo index name that designates a table's primary key.
pub const PRIMARY_INDEX: &str = "PRIMARY";

///
/// ColumnType
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ColumnType {
    Bool,
    Int,
    Uint,
    Text,
    Bytes,
}

impl ColumnType {
    /// Whether a non-NULL value inhabits this type.
    #[must_use]
    pub const fn admits(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Bool, Value::Bool(_))
                | (Self::Int, Value::Int(_))
                | (Self::Uint, Value::Uint(_))
                | (Self::Text, Value::Text(_))
                | (Self::Bytes, Value::Bytes(_))
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Text => "text",
            Self::Bytes => "bytes",
        };
        write!(f, "{label}")
    }
}

///
/// Column
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ColumnType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable,
        }
    }
}

///
/// TableSchema
///
/// Column definitions, primary key, secondary indexes, and foreign-key
/// declarations for one table. An empty primary key marks a keyless
/// table; its rows are addressed by surrogate row hash.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableSchema {
    name: String,
    columns: Vec<Column>,
    primary_key: Vec<String>,
    indexes: Vec<IndexSchema>,
    foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    pub fn try_new(
        name: impl Into<String>,
        columns: Vec<Column>,
        primary_key: Vec<String>,
        indexes: Vec<IndexSchema>,
        foreign_keys: Vec<ForeignKey>,
    ) -> Result<Self, InternalError> {
        let name = name.into();

        if columns.is_empty() {
            return Err(InternalError::schema_incompatible(format!(
                "table '{name}' has no columns"
            )));
        }

        let mut seen = BTreeSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(InternalError::schema_incompatible(format!(
                    "table '{name}' declares column '{}' more than once",
                    column.name
                )));
            }
        }

        let schema = Self {
            name,
            columns,
            primary_key,
            indexes,
            foreign_keys,
        };

        for key_column in &schema.primary_key {
            let Some(column) = schema.column(key_column) else {
                return Err(InternalError::schema_incompatible(format!(
                    "table '{}' primary key names missing column '{key_column}'",
                    schema.name
                )));
            };
            if column.nullable {
                return Err(InternalError::schema_incompatible(format!(
                    "table '{}' primary key column '{key_column}' must be NOT NULL",
                    schema.name
                )));
            }
        }

        for index in &schema.indexes {
            for indexed in index.columns() {
                if schema.column(indexed).is_none() {
                    return Err(InternalError::schema_incompatible(format!(
                        "table '{}' index '{}' names missing column '{indexed}'",
                        schema.name,
                        index.name()
                    )));
                }
            }
        }

        for fk in &schema.foreign_keys {
            if fk.columns().len() != fk.referenced_columns().len() {
                return Err(InternalError::schema_incompatible(format!(
                    "foreign key '{}' has mismatched column counts",
                    fk.name()
                )));
            }
            for referring in fk.columns() {
                if schema.column(referring).is_none() {
                    return Err(InternalError::schema_incompatible(format!(
                        "foreign key '{}' names missing column '{referring}' on table '{}'",
                        fk.name(),
                        schema.name
                    )));
                }
            }
        }

        Ok(schema)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    #[must_use]
    pub fn indexes(&self) -> &[IndexSchema] {
        &self.indexes
    }

    #[must_use]
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    #[must_use]
    pub const fn is_keyless(&self) -> bool {
        self.primary_key.is_empty()
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    #[must_use]
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    /// Positions of the primary-key columns in schema column order.
    #[must_use]
    pub fn key_positions(&self) -> Vec<usize> {
        self.primary_key
            .iter()
            .filter_map(|name| self.column_position(name))
            .collect()
    }

    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexSchema> {
        self.indexes.iter().find(|index| index.name() == name)
    }

    /// Resolve a named supporting index to its column list.
    ///
    /// `PRIMARY` designates the primary key itself.
    #[must_use]
    pub fn supporting_index_columns(&self, index_name: &str) -> Option<&[String]> {
        if index_name == PRIMARY_INDEX {
            if self.is_keyless() {
                return None;
            }
            return Some(&self.primary_key);
        }
        self.index(index_name).map(IndexSchema::columns)
    }

    /// Stable fingerprint over the canonical schema description.
    ///
    /// Changes whenever any column, key, index, or foreign-key facet
    /// changes; used to detect schema drift between recorded violations
    /// and the live table.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        fnv1a_64(self.canonical_descriptor().as_bytes())
    }

    fn canonical_descriptor(&self) -> String {
        use fmt::Write;

        let mut out = String::new();
        let _ = write!(out, "table={};", self.name);
        for column in &self.columns {
            let _ = write!(
                out,
                "col={}:{}:{};",
                column.name,
                column.ty,
                if column.nullable { "null" } else { "notnull" }
            );
        }
        let _ = write!(out, "pk={};", self.primary_key.join(","));
        for index in &self.indexes {
            let _ = write!(
                out,
                "idx={}:{}:{};",
                index.name(),
                index.columns().join(","),
                if index.unique() { "unique" } else { "multi" }
            );
        }
        for fk in &self.foreign_keys {
            let _ = write!(out, "fk={};", fk.canonical_descriptor());
        }
        out
    }

    /// Typecheck one row tuple against this schema.
    pub fn check_row(&self, values: &[Value]) -> Result<(), InternalError> {
        if values.len() != self.columns.len() {
            return Err(InternalError::new(
                crate::error::ErrorClass::Unsupported,
                ErrorOrigin::Schema,
                format!(
                    "table '{}' expects {} columns, row has {}",
                    self.name,
                    self.columns.len(),
                    values.len()
                ),
            ));
        }

        for (column, value) in self.columns.iter().zip(values) {
            if value.is_null() {
                if !column.nullable {
                    return Err(InternalError::constraint_violation(
                        ErrorOrigin::Schema,
                        format!(
                            "column '{}' of table '{}' is NOT NULL",
                            column.name, self.name
                        ),
                    ));
                }
                continue;
            }
            if !column.ty.admits(value) {
                return Err(InternalError::new(
                    crate::error::ErrorClass::Unsupported,
                    ErrorOrigin::Schema,
                    format!(
                        "value {value:?} does not inhabit column '{}' ({}) of table '{}'",
                        column.name, column.ty, self.name
                    ),
                ));
            }
        }

        Ok(())
    }
}
