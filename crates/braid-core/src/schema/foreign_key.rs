use serde::{Deserialize, Serialize};
use std::fmt;

///
/// ReferentialAction
///
/// Declared `ON DELETE` / `ON UPDATE` action. Recorded in violation
/// metadata at merge time; never executed by the merge engine.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum ReferentialAction {
    #[default]
    Restrict,
    Cascade,
    SetNull,
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
        };
        write!(f, "{label}")
    }
}

///
/// ForeignKey
///
/// A named foreign-key declaration: referring side (table, columns,
/// supporting index) and referenced side (table, columns, supporting
/// index) plus the declared actions.
///
/// A foreign key is *resolved* when both endpoint tables exist and both
/// supporting indexes exist; only resolved foreign keys participate in
/// merge-time validation. Unresolved declarations are preserved in the
/// schema and may become resolved by a later schema change or merge.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ForeignKey {
    name: String,
    table: String,
    columns: Vec<String>,
    index: String,
    referenced_table: String,
    referenced_columns: Vec<String>,
    referenced_index: String,
    on_delete: ReferentialAction,
    on_update: ReferentialAction,
}

impl ForeignKey {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<String>,
        index: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_columns: Vec<String>,
        referenced_index: impl Into<String>,
        on_delete: ReferentialAction,
        on_update: ReferentialAction,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns,
            index: index.into(),
            referenced_table: referenced_table.into(),
            referenced_columns,
            referenced_index: referenced_index.into(),
            on_delete,
            on_update,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn index(&self) -> &str {
        &self.index
    }

    #[must_use]
    pub fn referenced_table(&self) -> &str {
        &self.referenced_table
    }

    #[must_use]
    pub fn referenced_columns(&self) -> &[String] {
        &self.referenced_columns
    }

    #[must_use]
    pub fn referenced_index(&self) -> &str {
        &self.referenced_index
    }

    #[must_use]
    pub const fn on_delete(&self) -> ReferentialAction {
        self.on_delete
    }

    #[must_use]
    pub const fn on_update(&self) -> ReferentialAction {
        self.on_update
    }

    /// Whether the referring and referenced tables are the same relation.
    #[must_use]
    pub fn is_self_referential(&self) -> bool {
        self.table == self.referenced_table
    }

    #[must_use]
    pub(crate) fn canonical_descriptor(&self) -> String {
        format!(
            "{}:{}({})~{}->{}({})~{}:{}/{}",
            self.name,
            self.table,
            self.columns.join(","),
            self.index,
            self.referenced_table,
            self.referenced_columns.join(","),
            self.referenced_index,
            self.on_delete,
            self.on_update,
        )
    }
}
