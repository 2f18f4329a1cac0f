//! Schema and table inclusion rules.
//!
//! A table passes when it clears two gates in turn:
//!
//! 1. the schema gate: with a non-empty do-db list the schema must match one of
//!    it, otherwise a match in the ignore-db list rejects the table.
//! 2. the table gate, skipped for schema-level names: a do-table match accepts,
//!    else an ignore-table match rejects, else the table passes only when the
//!    do-table list is empty.
//!
//! A schema rejected by the first gate is never let back in by a table rule.

use std::collections::HashMap;

use regex::Regex;
use tracing::debug;

use common::err::re_error::ReError;
use common::err::CResult;
use common::schema::{QualifiedTable, Rules};

#[derive(Debug)]
enum Matcher {
    /// Lowercased literal.
    Exact(String),
    /// `~` pattern, compiled case-insensitive and searched anywhere in the name.
    Regex(Regex),
}

impl Matcher {
    fn compile(pattern: &str) -> CResult<Matcher> {
        match pattern.strip_prefix('~') {
            Some(expr) => {
                let regex = Regex::new(&format!("(?i){}", expr)).map_err(|e| ReError::InvalidRulePattern {
                    pattern: pattern.to_string(),
                    source: e,
                })?;
                Ok(Matcher::Regex(regex))
            }
            None => Ok(Matcher::Exact(pattern.to_lowercase())),
        }
    }

    fn is_match(&self, name: &str) -> bool {
        match self {
            Matcher::Exact(literal) => name.to_lowercase() == *literal,
            Matcher::Regex(regex) => regex.is_match(name),
        }
    }
}

/// Compiled rule set. Immutable once built, so it is shared across tasks without locks.
#[derive(Debug)]
pub struct Filter {
    rules: Option<Rules>,
    patterns: HashMap<String, Matcher>,
}

impl Filter {
    /// Compiles every pattern of `rules`. `None` builds a filter that lets everything through.
    pub fn new(rules: Option<Rules>) -> CResult<Filter> {
        let mut patterns = HashMap::new();
        if let Some(rules) = rules.as_ref() {
            for pattern in rules.patterns() {
                if !patterns.contains_key(pattern) {
                    patterns.insert(pattern.to_string(), Matcher::compile(pattern)?);
                }
            }
        }
        debug!("table filter built with {} patterns", patterns.len());

        Ok(Filter { rules, patterns })
    }

    /// Tables that pass the rules, in input order.
    pub fn apply_on(&self, tables: &[QualifiedTable]) -> Vec<QualifiedTable> {
        tables.iter().filter(|t| self.match_table(t)).cloned().collect()
    }

    pub fn match_table(&self, table: &QualifiedTable) -> bool {
        let rules = match self.rules.as_ref() {
            Some(rules) => rules,
            None => return true,
        };

        if !rules.do_dbs.is_empty() {
            if !self.match_db(&rules.do_dbs, &table.schema) {
                return false;
            }
        } else if !rules.ignore_dbs.is_empty() && self.match_db(&rules.ignore_dbs, &table.schema) {
            return false;
        }

        if table.name.is_empty() {
            return true;
        }
        if !rules.do_tables.is_empty() && self.match_tables(&rules.do_tables, table) {
            return true;
        }
        if !rules.ignore_tables.is_empty() && self.match_tables(&rules.ignore_tables, table) {
            return false;
        }

        rules.do_tables.is_empty()
    }

    fn match_db(&self, patterns: &[String], schema: &str) -> bool {
        patterns.iter().any(|p| self.match_string(p, schema))
    }

    fn match_tables(&self, patterns: &[QualifiedTable], table: &QualifiedTable) -> bool {
        patterns
            .iter()
            .any(|p| self.match_string(&p.schema, &table.schema) && self.match_string(&p.name, &table.name))
    }

    fn match_string(&self, pattern: &str, name: &str) -> bool {
        self.patterns.get(pattern).map_or(false, |m| m.is_match(name))
    }
}
