use std::fmt;

use serde::{Deserialize, Serialize};

/// Event kinds understood by fine-grained binlog event rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Not applicable, e.g. the DDL slot of a row event.
    #[serde(rename = "null")]
    NullEvent,
    #[serde(rename = "all")]
    AllEvent,
    #[serde(rename = "all dml")]
    AllDML,
    #[serde(rename = "all ddl")]
    AllDDL,

    #[serde(rename = "insert")]
    InsertEvent,
    #[serde(rename = "update")]
    UpdateEvent,
    #[serde(rename = "delete")]
    DeleteEvent,

    #[serde(rename = "create database")]
    CreateDatabase,
    #[serde(rename = "drop database")]
    DropDatabase,
    #[serde(rename = "create table")]
    CreateTable,
    #[serde(rename = "drop table")]
    DropTable,
    #[serde(rename = "truncate table")]
    TruncateTable,
    #[serde(rename = "rename table")]
    RenameTable,
    #[serde(rename = "create index")]
    CreateIndex,
    #[serde(rename = "drop index")]
    DropIndex,
    #[serde(rename = "alter table")]
    AlterTable,
}

impl EventType {
    pub fn is_dml(&self) -> bool {
        matches!(self, EventType::InsertEvent | EventType::UpdateEvent | EventType::DeleteEvent)
    }

    pub fn is_ddl(&self) -> bool {
        matches!(
            self,
            EventType::CreateDatabase
                | EventType::DropDatabase
                | EventType::CreateTable
                | EventType::DropTable
                | EventType::TruncateTable
                | EventType::RenameTable
                | EventType::CreateIndex
                | EventType::DropIndex
                | EventType::AlterTable
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::NullEvent => "null",
            EventType::AllEvent => "all",
            EventType::AllDML => "all dml",
            EventType::AllDDL => "all ddl",
            EventType::InsertEvent => "insert",
            EventType::UpdateEvent => "update",
            EventType::DeleteEvent => "delete",
            EventType::CreateDatabase => "create database",
            EventType::DropDatabase => "drop database",
            EventType::CreateTable => "create table",
            EventType::DropTable => "drop table",
            EventType::TruncateTable => "truncate table",
            EventType::RenameTable => "rename table",
            EventType::CreateIndex => "create index",
            EventType::DropIndex => "drop index",
            EventType::AlterTable => "alter table",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a fine-grained rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Do,
    Ignore,
}

/// One fine-grained binlog event rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BinlogEventRule {
    pub schema_pattern: String,

    /// Empty for a rule covering the whole schema.
    #[serde(default)]
    pub table_pattern: String,

    #[serde(default)]
    pub events: Vec<EventType>,

    /// Regular expressions over the statement text.
    #[serde(default)]
    pub sql_pattern: Vec<String>,

    pub action: Action,
}

impl BinlogEventRule {
    pub fn to_lower(&mut self) {
        self.schema_pattern = self.schema_pattern.to_lowercase();
        self.table_pattern = self.table_pattern.to_lowercase();
    }
}
