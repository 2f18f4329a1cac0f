use std::fmt;

use serde::{Deserialize, Serialize};

/// A table qualified by its schema.
///
/// An empty `name` stands for the schema itself, which is what schema-level
/// statements such as `CREATE DATABASE` resolve to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedTable {
    #[serde(rename = "db-name")]
    pub schema: String,

    #[serde(rename = "tbl-name", default)]
    pub name: String,
}

impl QualifiedTable {
    pub fn new<S: Into<String>, N: Into<String>>(schema: S, name: N) -> Self {
        QualifiedTable {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// The schema-level identity used by `CREATE/DROP/ALTER DATABASE`.
    pub fn schema_only<S: Into<String>>(schema: S) -> Self {
        QualifiedTable::new(schema, "")
    }

    pub fn is_schema_level(&self) -> bool {
        self.name.is_empty()
    }

    pub fn to_lower(&self) -> Self {
        QualifiedTable {
            schema: self.schema.to_lowercase(),
            name: self.name.to_lowercase(),
        }
    }
}

impl fmt::Display for QualifiedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`.`{}`", self.schema, self.name)
    }
}
