#[cfg(test)]
mod test_filter {
    use binlog::ast::QueryParser;
    use binlog::LogEventType;
    use common::config::SubTaskConfig;
    use filter::{RuleRouter, TableRouter};
    use syncer::SyncFilter;

    const TASK: &str = r#"
        name = "merge-shops"

        [from]
        host = "10.0.0.1"
        port = 3306
        user = "root"

        [to]
        host = "10.0.0.9"
        port = 4000
        user = "root"

        [bw-list]
        do-dbs = ["~^Shop_"]

        [[bw-list.ignore-tables]]
        db-name = "~^Shop_"
        tbl-name = "~^log_"

        [[route-rules]]
        schema-pattern = "shop_*"
        table-pattern = "orders_*"
        target-schema = "shop"
        target-table = "orders"

        [[route-rules]]
        schema-pattern = "shop_*"
        target-schema = "shop"

        [[filter-rules]]
        schema-pattern = "shop_*"
        events = ["truncate table", "drop table"]
        action = "Ignore"
    "#;

    fn setup() -> (SyncFilter, RuleRouter) {
        let cfg = SubTaskConfig::from_toml_str(TASK).unwrap();
        (SyncFilter::from_config(&cfg).unwrap(), RuleRouter::new(&cfg.route_rules).unwrap())
    }

    fn skip_ddl(filter: &SyncFilter, schema: &str, sql: &str) -> bool {
        let stmts = QueryParser::new(schema).parse(sql).unwrap();
        assert_eq!(stmts.len(), 1, "{}", sql);
        let mut stmt = stmts[0].clone();
        stmt.tables = stmt.tables.iter().map(|t| t.to_lower()).collect();
        filter.skip_ddl_event(&stmt).unwrap()
    }

    #[test]
    fn test_ddl_decisions() {
        let (filter, _) = setup();

        assert!(!skip_ddl(&filter, "shop_1", "CREATE TABLE orders_2024 (id INT PRIMARY KEY)"));
        assert!(!skip_ddl(&filter, "crm", "CREATE DATABASE shop_9"));
        assert!(skip_ddl(&filter, "shop_1", "TRUNCATE TABLE orders_2024"));
        assert!(skip_ddl(&filter, "shop_1", "DROP TABLE orders_2024"));
        assert!(skip_ddl(&filter, "shop_1", "CREATE TABLE log_access (id INT)"));
        assert!(skip_ddl(&filter, "crm", "CREATE TABLE users (id INT)"));
        assert!(skip_ddl(&filter, "shop_1", "CREATE TABLE mysql.plugin_x (id INT)"));
    }

    #[test]
    fn test_raw_query_decisions() {
        let (filter, _) = setup();

        for sql in ["GRANT ALL ON *.* TO 'u'@'%'", "FLUSH LOGS", "SAVEPOINT sp1", "OPTIMIZE TABLE t"] {
            assert!(filter.skip_query(&[], sql).unwrap(), "{}", sql);
        }
        assert!(!filter.skip_query(&[], "BEGIN").unwrap());
    }

    #[test]
    fn test_rows_and_routes() {
        let (filter, router) = setup();

        assert!(!filter.skip_dml_event("SHOP_2", "Orders_2023", LogEventType::WRITE_ROWS_EVENT).unwrap());
        assert!(filter.skip_dml_event("shop_2", "log_login", LogEventType::UPDATE_ROWS_EVENT).unwrap());
        assert!(filter.skip_dml_event("mysql", "user", LogEventType::DELETE_ROWS_EVENT).unwrap());
        assert!(filter.skip_dml_event("crm", "users", LogEventType::WRITE_ROWS_EVENT).unwrap());
        // not a row event, only an error once fine-grained rules have to see it
        assert!(filter.skip_dml_event("shop_2", "orders_1", LogEventType::QUERY_EVENT).is_err());

        assert_eq!(
            router.route("shop_2", "orders_2023").unwrap(),
            ("shop".to_string(), "orders".to_string())
        );
        assert_eq!(
            router.route("shop_3", "customers").unwrap(),
            ("shop".to_string(), "customers".to_string())
        );
        assert_eq!(
            router.route("crm", "users").unwrap(),
            ("crm".to_string(), "users".to_string())
        );
    }
}
