use lazy_static::lazy_static;
use regex::Regex;
use sqlparser::ast::{AlterTableOperation, ObjectName, ObjectType, SchemaName, Statement};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use common::config::EventType;
use common::err::re_error::ReError;
use common::err::CResult;
use common::schema::QualifiedTable;

lazy_static! {
    /// `DROP DATABASE` is a MySQL synonym of `DROP SCHEMA`, which the parser understands.
    static ref DROP_DATABASE: Regex = Regex::new(r"(?i)^\s*DROP\s+DATABASE\b").unwrap();

    static ref RENAME_TABLE: Regex = Regex::new(r"(?is)^\s*RENAME\s+TABLES?\s+(.+?)\s*;?\s*$").unwrap();
    static ref RENAME_PAIR: Regex = Regex::new(r"(?is)^\s*(\S+)\s+TO\s+(\S+)\s*$").unwrap();

    static ref DROP_INDEX_ON: Regex =
        Regex::new(r"(?is)^\s*DROP\s+INDEX\s+\S+\s+ON\s+(\S+?)\s*;?\s*$").unwrap();
}

/// One statement of a query event, reduced to what the binlog filter needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStatement {
    /// DDL kind, `NullEvent` for anything that is not DDL.
    pub event: EventType,
    /// Tables the statement touches, schema-level names for database DDL.
    pub tables: Vec<QualifiedTable>,
}

/// DDL kind of a parsed statement, `NullEvent` when it is not a DDL this system tracks.
pub fn ddl_event_type(stmt: &Statement) -> EventType {
    match stmt {
        Statement::CreateDatabase { .. } | Statement::CreateSchema { .. } => EventType::CreateDatabase,
        Statement::CreateTable { .. } => EventType::CreateTable,
        Statement::CreateIndex { .. } => EventType::CreateIndex,
        Statement::Truncate { .. } => EventType::TruncateTable,
        Statement::AlterTable { operations, .. } => {
            if operations.iter().any(|op| matches!(op, AlterTableOperation::RenameTable { .. })) {
                EventType::RenameTable
            } else {
                EventType::AlterTable
            }
        }
        Statement::Drop { object_type, .. } => match object_type {
            ObjectType::Schema => EventType::DropDatabase,
            ObjectType::Table => EventType::DropTable,
            ObjectType::Index => EventType::DropIndex,
            _ => EventType::NullEvent,
        },
        _ => EventType::NullEvent,
    }
}

/// Splits query events into statements and resolves their tables against the
/// schema the event was executed in.
pub struct QueryParser {
    default_schema: String,
}

impl QueryParser {
    pub fn new(default_schema: &str) -> Self {
        QueryParser {
            default_schema: default_schema.to_string(),
        }
    }

    pub fn parse(&self, sql: &str) -> CResult<Vec<QueryStatement>> {
        if let Some(stmt) = self.parse_unsupported(sql) {
            return Ok(vec![stmt]);
        }

        let sql = DROP_DATABASE.replace(sql, "DROP SCHEMA");
        let statements = Parser::parse_sql(&MySqlDialect {}, &sql)
            .map_err(|e| ReError::SqlParseErr(format!("{} in [{}]", e, sql)))?;
        debug!("parsed {} statements from [{}]", statements.len(), sql);

        Ok(statements.iter().map(|s| self.to_statement(s)).collect())
    }

    /// MySQL forms the sql parser does not accept.
    fn parse_unsupported(&self, sql: &str) -> Option<QueryStatement> {
        if let Some(caps) = RENAME_TABLE.captures(sql) {
            let mut tables = vec![];
            for pair in caps[1].split(',') {
                if let Some(p) = RENAME_PAIR.captures(pair) {
                    tables.push(self.table_from_text(&p[1]));
                    tables.push(self.table_from_text(&p[2]));
                }
            }
            return Some(QueryStatement {
                event: EventType::RenameTable,
                tables,
            });
        }

        DROP_INDEX_ON.captures(sql).map(|caps| QueryStatement {
            event: EventType::DropIndex,
            tables: vec![self.table_from_text(&caps[1])],
        })
    }

    fn to_statement(&self, stmt: &Statement) -> QueryStatement {
        let tables = match stmt {
            Statement::CreateDatabase { db_name, .. } => vec![self.schema_from_name(db_name)],
            Statement::CreateSchema { schema_name, .. } => match schema_name {
                SchemaName::Simple(name) | SchemaName::NamedAuthorization(name, _) => {
                    vec![self.schema_from_name(name)]
                }
                SchemaName::UnnamedAuthorization(_) => vec![],
            },
            Statement::CreateTable { name, .. } => vec![self.table_from_name(name)],
            Statement::CreateIndex { table_name, .. } => vec![self.table_from_name(table_name)],
            Statement::Truncate { table_name, .. } => vec![self.table_from_name(table_name)],
            Statement::AlterTable { name, operations, .. } => {
                let mut tables = vec![self.table_from_name(name)];
                for op in operations {
                    if let AlterTableOperation::RenameTable { table_name } = op {
                        tables.push(self.table_from_name(table_name));
                    }
                }
                tables
            }
            Statement::Drop { object_type, names, .. } => match object_type {
                ObjectType::Schema => names.iter().map(|n| self.schema_from_name(n)).collect(),
                ObjectType::Table => names.iter().map(|n| self.table_from_name(n)).collect(),
                _ => vec![],
            },
            _ => vec![],
        };

        QueryStatement {
            event: ddl_event_type(stmt),
            tables,
        }
    }

    fn schema_from_name(&self, name: &ObjectName) -> QualifiedTable {
        let schema = name.0.last().map(|i| i.value.clone()).unwrap_or_default();
        QualifiedTable::schema_only(schema)
    }

    fn table_from_name(&self, name: &ObjectName) -> QualifiedTable {
        match name.0.as_slice() {
            [schema, table] => QualifiedTable::new(schema.value.as_str(), table.value.as_str()),
            [.., table] => QualifiedTable::new(self.default_schema.as_str(), table.value.as_str()),
            [] => QualifiedTable::schema_only(self.default_schema.as_str()),
        }
    }

    fn table_from_text(&self, text: &str) -> QualifiedTable {
        let parts: Vec<&str> = text.split('.').map(|p| p.trim_matches('`')).collect();
        match parts.as_slice() {
            [schema, table] => QualifiedTable::new(*schema, *table),
            _ => QualifiedTable::new(self.default_schema.as_str(), text.trim_matches('`')),
        }
    }
}
