//! Decides whether a binlog event replicates.
//!
//! The checks run in order and the first one that skips wins:
//!
//! 1. built-in skip patterns, raw SQL only
//! 2. system schemas
//! 3. the do/ignore table rules, skipping when every table is filtered out
//! 4. the fine-grained event rules, skipping when any table is ignored

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use binlog::ast::QueryStatement;
use binlog::{BinlogEventFilter, EventFilter, LogEventType};
use common::config::{Action, EventType, SubTaskConfig};
use common::err::CResult;
use common::schema::QualifiedTable;
use filter::{is_system_schema, Filter};

/// Statements never replicated, whatever the table rules say.
const BUILTIN_SKIP_DDLS: &[&str] = &[
    // MariaDB dummy query events
    "^#",
    "^SAVEPOINT",
    "^FLUSH",
    // table maintenance
    r"^OPTIMIZE\s+TABLE",
    r"^ANALYZE\s+TABLE",
    r"^REPAIR\s+TABLE",
    // temporary tables
    r"^DROP\s+(/\*!40005\s+)?TEMPORARY\s+(\*/\s+)?TABLE",
    // triggers
    r"^CREATE\s+(DEFINER\s?=.+?)?TRIGGER",
    r"^DROP\s+TRIGGER",
    // procedures
    r"^DROP\s+PROCEDURE",
    r"^CREATE\s+(DEFINER\s?=.+?)?PROCEDURE",
    r"^ALTER\s+PROCEDURE",
    // views
    r"^CREATE\s*(OR REPLACE)?\s+(ALGORITHM\s?=.+?)?(DEFINER\s?=.+?)?\s+(SQL SECURITY DEFINER)?VIEW",
    r"^DROP\s+VIEW",
    r"^ALTER\s+(ALGORITHM\s?=.+?)?(DEFINER\s?=.+?)?(SQL SECURITY DEFINER)?VIEW",
    // user-defined and stored functions
    r"^CREATE\s+(AGGREGATE)?\s*?FUNCTION",
    r"^CREATE\s+(DEFINER\s?=.+?)?FUNCTION",
    r"^ALTER\s+FUNCTION",
    r"^DROP\s+FUNCTION",
    // tablespaces
    r"^CREATE\s+TABLESPACE",
    r"^ALTER\s+TABLESPACE",
    r"^DROP\s+TABLESPACE",
    // account management
    "^GRANT",
    "^REVOKE",
    r"^CREATE\s+USER",
    r"^ALTER\s+USER",
    r"^RENAME\s+USER",
    r"^DROP\s+USER",
    r"^SET\s+PASSWORD",
    "^ALTER DATABASE",
];

lazy_static! {
    static ref BUILTIN_SKIP_PATTERN: Regex = Regex::new(&format!("(?i){}", BUILTIN_SKIP_DDLS.join("|"))).unwrap();
}

pub struct SyncFilter {
    bw: Filter,
    /// `None` when no fine-grained rule is configured.
    event_filter: Option<Arc<dyn EventFilter>>,
}

impl SyncFilter {
    pub fn new(bw: Filter, event_filter: Option<Arc<dyn EventFilter>>) -> Self {
        SyncFilter { bw, event_filter }
    }

    pub fn from_config(cfg: &SubTaskConfig) -> CResult<Self> {
        let bw = Filter::new(cfg.bw_list.clone())?;
        let event_filter: Option<Arc<dyn EventFilter>> = if cfg.filter_rules.is_empty() {
            None
        } else {
            Some(Arc::new(BinlogEventFilter::new(&cfg.filter_rules)?))
        };

        Ok(SyncFilter::new(bw, event_filter))
    }

    pub fn is_builtin_skip(sql: &str) -> bool {
        BUILTIN_SKIP_PATTERN.is_match(sql)
    }

    /// Whether the tables alone skip the statement: any system schema, or no table
    /// surviving the table rules.
    fn gate_tables(&self, tables: &[QualifiedTable]) -> bool {
        if tables.iter().any(|t| is_system_schema(&t.schema)) {
            return true;
        }

        !tables.is_empty() && self.bw.apply_on(tables).is_empty()
    }

    /// Raw SQL variant, for query events the parser could not handle.
    pub fn skip_query(&self, tables: &[QualifiedTable], sql: &str) -> CResult<bool> {
        if SyncFilter::is_builtin_skip(sql) {
            return Ok(true);
        }
        if self.gate_tables(tables) {
            return Ok(true);
        }
        let event_filter = match self.event_filter.as_ref() {
            Some(f) => f,
            None => return Ok(false),
        };

        if tables.is_empty() {
            let action = event_filter
                .filter("", "", EventType::NullEvent, EventType::NullEvent, sql)
                .map_err(|e| e.annotate(format!("skip query {}", sql)))?;
            return Ok(action == Action::Ignore);
        }
        for table in tables {
            let action = event_filter
                .filter(&table.schema, &table.name, EventType::NullEvent, EventType::NullEvent, sql)
                .map_err(|e| e.annotate(format!("skip query {} on {}", sql, table)))?;
            if action == Action::Ignore {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Parsed statement variant. Built-in patterns are not consulted.
    pub fn skip_ddl_event(&self, stmt: &QueryStatement) -> CResult<bool> {
        let tables = &stmt.tables;
        if self.gate_tables(tables) {
            return Ok(true);
        }
        let event_filter = match self.event_filter.as_ref() {
            Some(f) => f,
            None => return Ok(false),
        };

        if tables.is_empty() {
            let action = event_filter
                .filter("", "", EventType::NullEvent, stmt.event, "")
                .map_err(|e| e.annotate(format!("skip query event {}", stmt.event)))?;
            return Ok(action == Action::Ignore);
        }
        for table in tables {
            let action = event_filter
                .filter(&table.schema, &table.name, EventType::NullEvent, stmt.event, "")
                .map_err(|e| e.annotate(format!("skip query event {} on {}", stmt.event, table)))?;
            if action == Action::Ignore {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Row event variant. Identifiers are lowercased before matching.
    pub fn skip_dml_event(&self, schema: &str, table: &str, event_type: LogEventType) -> CResult<bool> {
        if is_system_schema(schema) {
            return Ok(true);
        }

        let table = QualifiedTable::new(schema, table).to_lower();
        if !self.bw.match_table(&table) {
            return Ok(true);
        }
        let event_filter = match self.event_filter.as_ref() {
            Some(f) => f,
            None => return Ok(false),
        };

        let dml = event_type.dml_event_type()?;
        let action = event_filter
            .filter(&table.schema, &table.name, dml, EventType::NullEvent, "")
            .map_err(|e| e.annotate(format!("skip row event {:?} on {}", event_type, table)))?;

        Ok(action == Action::Ignore)
    }
}
