use common::config::RouteRule;
use common::err::re_error::ReError;
use common::err::CResult;

use crate::glob::Glob;

/// Resolves the target name of a source table.
pub trait TableRouter: Send + Sync {
    /// `(target schema, target table)` of `schema`.`table`. An empty `table` routes a schema.
    fn route(&self, schema: &str, table: &str) -> CResult<(String, String)>;
}

#[derive(Debug)]
struct TableRule {
    schema: Glob,
    table: Glob,
    rule: RouteRule,
}

#[derive(Debug)]
struct SchemaRule {
    schema: Glob,
    rule: RouteRule,
}

/// Router over `route-rules`.
///
/// Table rules are tried first, then schema rules, which only rename the schema.
/// A name no rule covers routes to itself.
#[derive(Debug, Default)]
pub struct RuleRouter {
    table_rules: Vec<TableRule>,
    schema_rules: Vec<SchemaRule>,
}

impl RuleRouter {
    pub fn new(rules: &[RouteRule]) -> CResult<RuleRouter> {
        let mut router = RuleRouter::default();
        for rule in rules {
            if rule.schema_pattern.is_empty() || rule.target_schema.is_empty() {
                return Err(ReError::RouteErr(format!(
                    "schema pattern and target schema are required, got {:?}",
                    rule
                )));
            }

            let schema = Glob::new(&rule.schema_pattern)?;
            if rule.table_pattern.is_empty() {
                router.schema_rules.push(SchemaRule {
                    schema,
                    rule: rule.clone(),
                });
            } else {
                router.table_rules.push(TableRule {
                    schema,
                    table: Glob::new(&rule.table_pattern)?,
                    rule: rule.clone(),
                });
            }
        }

        Ok(router)
    }
}

impl TableRouter for RuleRouter {
    fn route(&self, schema: &str, table: &str) -> CResult<(String, String)> {
        if !table.is_empty() {
            let mut matched = self
                .table_rules
                .iter()
                .filter(|r| r.schema.is_match(schema) && r.table.is_match(table))
                .map(|r| &r.rule);

            if let Some(rule) = matched.next() {
                if let Some(other) = matched.next() {
                    return Err(ReError::RouteErr(format!(
                        "`{}`.`{}` matches more than one table rule: {:?} and {:?}",
                        schema, table, rule, other
                    )));
                }
                let target_table = if rule.target_table.is_empty() {
                    table.to_string()
                } else {
                    rule.target_table.clone()
                };
                return Ok((rule.target_schema.clone(), target_table));
            }
        }

        match self.schema_rules.iter().find(|r| r.schema.is_match(schema)) {
            Some(r) => Ok((r.rule.target_schema.clone(), table.to_string())),
            None => Ok((schema.to_string(), table.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use common::config::RouteRule;

    use crate::router::{RuleRouter, TableRouter};

    fn route(router: &RuleRouter, schema: &str, table: &str) -> (String, String) {
        router.route(schema, table).unwrap()
    }

    #[test]
    fn test_route() {
        let router = RuleRouter::new(&[
            RouteRule::new("shop_*", "", "shop", ""),
            RouteRule::new("shop_*", "orders_?", "shop", "orders"),
        ])
        .unwrap();

        assert_eq!(route(&router, "shop_01", "orders_1"), ("shop".into(), "orders".into()));
        assert_eq!(route(&router, "shop_01", "items"), ("shop".into(), "items".into()));
        assert_eq!(route(&router, "shop_01", ""), ("shop".into(), "".into()));
        assert_eq!(route(&router, "crm", "users"), ("crm".into(), "users".into()));
    }

    #[test]
    fn test_ambiguous_table_rules() {
        let router = RuleRouter::new(&[
            RouteRule::new("shop_*", "orders*", "shop", "orders"),
            RouteRule::new("shop_0?", "orders_*", "shop", "orders_v2"),
        ])
        .unwrap();

        assert!(router.route("shop_01", "orders_1").is_err());
        assert!(router.route("shop_11", "orders_1").is_ok());
    }

    #[test]
    fn test_invalid_rule() {
        assert!(RuleRouter::new(&[RouteRule::new("", "", "shop", "")]).is_err());
        assert!(RuleRouter::new(&[RouteRule::new("shop", "", "", "")]).is_err());
    }
}
