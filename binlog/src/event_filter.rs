use regex::Regex;
use tracing::trace;

use common::config::{Action, BinlogEventRule, EventType};
use common::err::re_error::ReError;
use common::err::CResult;
use filter::Glob;

/// Fine-grained evaluator deciding whether one event of one table replicates.
pub trait EventFilter: Send + Sync {
    /// `dml` is `NullEvent` for DDL and `ddl` is `NullEvent` for DML.
    fn filter(&self, schema: &str, table: &str, dml: EventType, ddl: EventType, sql: &str) -> CResult<Action>;
}

#[derive(Debug)]
struct CompiledRule {
    schema: Glob,
    /// `None` for a schema-level rule.
    table: Option<Glob>,
    events: Vec<EventType>,
    sql: Vec<Regex>,
    action: Action,
}

impl CompiledRule {
    fn compile(rule: &BinlogEventRule) -> CResult<CompiledRule> {
        let table = if rule.table_pattern.is_empty() {
            None
        } else {
            Some(Glob::new(&rule.table_pattern)?)
        };

        let mut sql = Vec::with_capacity(rule.sql_pattern.len());
        for pattern in &rule.sql_pattern {
            let regex = Regex::new(&format!("(?i){}", pattern)).map_err(|e| ReError::InvalidRulePattern {
                pattern: pattern.clone(),
                source: e,
            })?;
            sql.push(regex);
        }

        Ok(CompiledRule {
            schema: Glob::new(&rule.schema_pattern)?,
            table,
            events: rule.events.clone(),
            sql,
            action: rule.action,
        })
    }

    fn selects(&self, schema: &str, table: &str) -> bool {
        if !self.schema.is_match(schema) {
            return false;
        }
        match &self.table {
            None => true,
            Some(glob) => !table.is_empty() && glob.is_match(table),
        }
    }

    fn match_event(&self, dml: EventType, ddl: EventType) -> bool {
        self.events.iter().any(|e| match e {
            EventType::AllEvent => true,
            EventType::AllDML => dml.is_dml(),
            EventType::AllDDL => ddl.is_ddl(),
            EventType::NullEvent => false,
            other => *other == dml || *other == ddl,
        })
    }

    fn match_sql(&self, sql: &str) -> bool {
        !sql.is_empty() && self.sql.iter().any(|r| r.is_match(sql))
    }
}

/// Rule-table evaluator over `filter-rules`.
///
/// Every rule selecting the table is consulted in order. An `Ignore` rule whose
/// events or SQL patterns match ignores the event, and so does a `Do` rule whose
/// events and SQL patterns all miss. An event surviving every rule is done.
#[derive(Debug)]
pub struct BinlogEventFilter {
    rules: Vec<CompiledRule>,
}

impl BinlogEventFilter {
    pub fn new(rules: &[BinlogEventRule]) -> CResult<BinlogEventFilter> {
        let rules = rules.iter().map(CompiledRule::compile).collect::<CResult<Vec<_>>>()?;
        Ok(BinlogEventFilter { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl EventFilter for BinlogEventFilter {
    fn filter(&self, schema: &str, table: &str, dml: EventType, ddl: EventType, sql: &str) -> CResult<Action> {
        for rule in self.rules.iter().filter(|r| r.selects(schema, table)) {
            let matched = rule.match_event(dml, ddl) || rule.match_sql(sql);
            match (rule.action, matched) {
                (Action::Ignore, true) | (Action::Do, false) => {
                    trace!("`{}`.`{}` {}/{} ignored by rule on {}", schema, table, dml, ddl, rule.schema.as_str());
                    return Ok(Action::Ignore);
                }
                _ => {}
            }
        }

        Ok(Action::Do)
    }
}

#[cfg(test)]
mod test {
    use common::config::{Action, BinlogEventRule, EventType};
    use common::err::re_error::ReError;

    use crate::event_filter::{BinlogEventFilter, EventFilter};

    fn rule(schema: &str, table: &str, events: Vec<EventType>, sql: Vec<&str>, action: Action) -> BinlogEventRule {
        BinlogEventRule {
            schema_pattern: schema.to_string(),
            table_pattern: table.to_string(),
            events,
            sql_pattern: sql.into_iter().map(String::from).collect(),
            action,
        }
    }

    const NULL: EventType = EventType::NullEvent;

    #[test]
    fn test_ignore_rule() {
        let filter = BinlogEventFilter::new(&[rule(
            "shop*",
            "log_*",
            vec![EventType::AllDML, EventType::TruncateTable],
            vec![],
            Action::Ignore,
        )])
        .unwrap();

        let f = |t: &str, dml, ddl| filter.filter("shop_1", t, dml, ddl, "").unwrap();
        assert_eq!(f("log_a", EventType::InsertEvent, NULL), Action::Ignore);
        assert_eq!(f("log_a", NULL, EventType::TruncateTable), Action::Ignore);
        assert_eq!(f("log_a", NULL, EventType::CreateTable), Action::Do);
        assert_eq!(f("orders", EventType::DeleteEvent, NULL), Action::Do);
        // table rules never select schema-level statements
        assert_eq!(f("", NULL, EventType::DropDatabase), Action::Do);
    }

    #[test]
    fn test_do_rule_ignores_the_rest() {
        let filter = BinlogEventFilter::new(&[rule(
            "shop",
            "",
            vec![EventType::InsertEvent, EventType::AllDDL],
            vec![],
            Action::Do,
        )])
        .unwrap();

        assert_eq!(filter.filter("shop", "a", EventType::InsertEvent, NULL, "").unwrap(), Action::Do);
        assert_eq!(filter.filter("shop", "a", EventType::UpdateEvent, NULL, "").unwrap(), Action::Ignore);
        assert_eq!(filter.filter("shop", "", NULL, EventType::DropDatabase, "").unwrap(), Action::Do);
        assert_eq!(filter.filter("crm", "a", EventType::UpdateEvent, NULL, "").unwrap(), Action::Do);
    }

    #[test]
    fn test_sql_pattern() {
        let filter = BinlogEventFilter::new(&[rule("*", "", vec![], vec!["^ALTER\\s+TABLE\\s+\\S+\\s+ADD\\s+PARTITION"], Action::Ignore)])
            .unwrap();

        let sql = "alter table t add partition (partition p1 values less than (10))";
        assert_eq!(filter.filter("shop", "t", NULL, EventType::AlterTable, sql).unwrap(), Action::Ignore);
        assert_eq!(
            filter.filter("shop", "t", NULL, EventType::AlterTable, "ALTER TABLE t ADD COLUMN c INT").unwrap(),
            Action::Do
        );
    }

    #[test]
    fn test_empty_and_invalid() {
        let filter = BinlogEventFilter::new(&[]).unwrap();
        assert!(filter.is_empty());
        assert_eq!(filter.filter("", "", NULL, NULL, "BEGIN").unwrap(), Action::Do);

        let err = BinlogEventFilter::new(&[rule("*", "", vec![], vec!["(unclosed"], Action::Ignore)]).unwrap_err();
        assert!(matches!(err, ReError::InvalidRulePattern { .. }));
    }
}
