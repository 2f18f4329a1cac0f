use serde::{Deserialize, Serialize};

use crate::schema::table::QualifiedTable;

/// Do/ignore lists for schemas and tables (the "black-white list").
///
/// A pattern starting with `~` is a regular expression over the remainder,
/// anything else is matched literally. Both forms are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Rules {
    #[serde(default)]
    pub do_tables: Vec<QualifiedTable>,

    #[serde(default)]
    pub do_dbs: Vec<String>,

    #[serde(default)]
    pub ignore_tables: Vec<QualifiedTable>,

    #[serde(default)]
    pub ignore_dbs: Vec<String>,
}

impl Rules {
    /// Lowercases every entry.
    pub fn to_lower(&mut self) {
        for table in self.do_tables.iter_mut().chain(self.ignore_tables.iter_mut()) {
            *table = table.to_lower();
        }
        for db in self.do_dbs.iter_mut().chain(self.ignore_dbs.iter_mut()) {
            *db = db.to_lowercase();
        }
    }

    /// Every pattern string of the rule set, duplicates included.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        let dbs = self.do_dbs.iter().chain(self.ignore_dbs.iter()).map(String::as_str);
        let tables = self
            .do_tables
            .iter()
            .chain(self.ignore_tables.iter())
            .flat_map(|t| [t.schema.as_str(), t.name.as_str()]);

        dbs.chain(tables)
    }

    pub fn is_empty(&self) -> bool {
        self.do_tables.is_empty()
            && self.do_dbs.is_empty()
            && self.ignore_tables.is_empty()
            && self.ignore_dbs.is_empty()
    }
}
