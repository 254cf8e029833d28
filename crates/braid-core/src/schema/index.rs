use serde::{Deserialize, Serialize};

///
/// IndexSchema
///
/// One secondary index over a column subset. Unique indexes exclude
/// NULL: a row with NULL in any indexed column takes no index key and
/// cannot collide.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct IndexSchema {
    name: String,
    columns: Vec<String>,
    unique: bool,
}

impl IndexSchema {
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<String>, unique: bool) -> Self {
        Self {
            name: name.into(),
            columns,
            unique,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub const fn unique(&self) -> bool {
        self.unique
    }
}
