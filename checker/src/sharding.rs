use std::collections::{BTreeMap, HashMap};

use common::schema::QualifiedTable;

/// instance => schema => tables
pub type InstanceTables = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Source tables of every instance grouped by the target table they merge into.
#[derive(Debug, Default)]
pub struct ShardingMap {
    targets: BTreeMap<String, InstanceTables>,
    counter: HashMap<String, usize>,
}

impl ShardingMap {
    pub fn new() -> Self {
        ShardingMap::default()
    }

    pub fn add(&mut self, target: &str, instance: &str, table: &QualifiedTable) {
        self.targets
            .entry(target.to_string())
            .or_default()
            .entry(instance.to_string())
            .or_default()
            .entry(table.schema.clone())
            .or_default()
            .push(table.name.clone());
        *self.counter.entry(target.to_string()).or_insert(0) += 1;
    }

    /// Number of source tables merged into `target`.
    pub fn count(&self, target: &str) -> usize {
        self.counter.get(target).copied().unwrap_or(0)
    }

    /// Targets fed by more than one source table, which need a consistency check.
    pub fn merged_targets(&self) -> impl Iterator<Item = (&String, &InstanceTables)> {
        self.targets.iter().filter(|(target, _)| self.count(target) > 1)
    }
}
