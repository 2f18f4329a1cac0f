#[cfg(test)]
mod test_worker {
    use std::sync::Arc;
    use std::time::Duration;

    use binlog::LogEventType;
    use common::config::SubTaskConfig;
    use common::db::mock::{MockDatabase, MockDatabaseProvider};
    use common::log::init_test_log;
    use common::model::process::ErrorType;
    use common::model::rpc::{
        HandleSubTaskSqlsRequest, OperateSubTaskRequest, QueryStatusRequest, SqlOp, StartSubTaskRequest, TaskOp,
    };
    use common::model::stage::Stage;
    use common::model::status::{SubTaskStatus, UnitStatus, UnitType};
    use syncer::mock::{MockSink, MockSinkProvider, MockStreamerProvider};
    use syncer::{BinlogPosition, Job, ReplicationEvent};
    use worker::{DefaultUnitFactory, Worker};

    const TASK_NAME: &str = "shop-sync";

    const TASK: &str = r#"
        name = "shop-sync"
        check-timeout = 10

        [from]
        host = "shop"
        port = 3306
        user = "root"

        [to]
        host = "target"
        port = 4000
        user = "root"

        [bw-list]
        do-dbs = ["shop"]
    "#;

    fn source(binlog_format: &str) -> MockDatabase {
        MockDatabase::new()
            .with_variable("log_bin", "ON")
            .with_variable("binlog_format", binlog_format)
            .with_variable("binlog_row_image", "FULL")
            .with_rows("SHOW GRANTS", vec![vec!["GRANT ALL PRIVILEGES ON *.* TO 'root'@'%'"]])
            .with_rows("SHOW DATABASES", vec![vec!["mysql"], vec!["shop"], vec!["crm"]])
            .with_rows(
                "SHOW FULL TABLES IN `shop` WHERE Table_Type != 'VIEW'",
                vec![vec!["orders", "BASE TABLE"]],
            )
            .with_rows(
                "SHOW FULL TABLES IN `crm` WHERE Table_Type != 'VIEW'",
                vec![vec!["users", "BASE TABLE"]],
            )
            .with_rows(
                "SHOW COLUMNS FROM `shop`.`orders`",
                vec![vec!["id", "int", "NO", "PRI", "", ""]],
            )
    }

    struct Env {
        worker: Worker,
        source: Arc<MockDatabase>,
        upstream: Arc<MockStreamerProvider>,
        sink: Arc<MockSink>,
    }

    fn env(source: MockDatabase, upstream: MockStreamerProvider) -> Env {
        init_test_log();
        let cfg = SubTaskConfig::from_toml_str(TASK).unwrap();
        let source = Arc::new(source);
        let provider = MockDatabaseProvider::new()
            .with_instance(&cfg.from, source.clone())
            .with_instance(&cfg.to, Arc::new(MockDatabase::new()));
        let upstream = Arc::new(upstream);
        let sink = Arc::new(MockSink::new());
        let factory = DefaultUnitFactory::new(
            Arc::new(provider),
            upstream.clone(),
            Arc::new(MockSinkProvider::new(sink.clone())),
        );

        Env {
            worker: Worker::new("worker-e2e", Arc::new(factory)),
            source,
            upstream,
            sink,
        }
    }

    fn pos(pos: u32) -> BinlogPosition {
        BinlogPosition::new("mysql-bin.000001", pos)
    }

    fn query(at: u32, sql: &str) -> ReplicationEvent {
        ReplicationEvent::Query {
            position: pos(at),
            schema: "shop".to_string(),
            sql: sql.to_string(),
        }
    }

    fn insert(at: u32, schema: &str, table: &str) -> ReplicationEvent {
        ReplicationEvent::Rows {
            position: pos(at),
            event_type: LogEventType::WRITE_ROWS_EVENT,
            schema: schema.to_string(),
            table: table.to_string(),
            rows: vec![vec![Some("1".to_string())]],
        }
    }

    async fn wait_status<F: Fn(&SubTaskStatus) -> bool>(worker: &Worker, f: F) -> SubTaskStatus {
        for _ in 0..500 {
            let resp = worker.query_status(&QueryStatusRequest {
                name: TASK_NAME.to_string(),
            });
            if let Some(status) = resp.sub_task_status.first() {
                if f(status) {
                    return status.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("sub task never reached the expected status");
    }

    fn total_jobs(status: &SubTaskStatus) -> i64 {
        match &status.status {
            UnitStatus::Sync(s) => s.total_jobs,
            _ => 0,
        }
    }

    async fn operate(worker: &Worker, op: TaskOp) {
        let resp = worker
            .operate_sub_task(&OperateSubTaskRequest {
                op,
                name: TASK_NAME.to_string(),
            })
            .await;
        assert!(resp.result, "{:?}: {}", op, resp.msg);
    }

    #[tokio::test]
    async fn test_check_then_sync() {
        let env = env(source("ROW"), MockStreamerProvider::new());
        let resp = env.worker.start_sub_task(&StartSubTaskRequest { task: TASK.to_string() }).await;
        assert!(resp.result, "{}", resp.msg);

        env.upstream.push(query(100, "CREATE TABLE orders (id INT PRIMARY KEY)"));
        env.upstream.push(insert(200, "shop", "orders"));
        env.upstream.push(insert(300, "crm", "users"));
        env.upstream.push(ReplicationEvent::Xid { position: pos(400) });

        let status = wait_status(&env.worker, |s| total_jobs(s) == 3).await;
        assert_eq!(status.stage, Stage::Running);
        assert_eq!(status.unit, Some(UnitType::Sync));
        match status.status {
            UnitStatus::Sync(s) => {
                assert_eq!(s.total_events, 3);
                assert_eq!(s.skipped_events, 1);
                assert_eq!(s.sync_position, "mysql-bin.000001:400");
            }
            other => panic!("unexpected status {:?}", other),
        }

        // skip a statement by hand while paused
        operate(&env.worker, TaskOp::Pause).await;
        let resp = env.worker.handle_sqls(&HandleSubTaskSqlsRequest {
            name: TASK_NAME.to_string(),
            op: SqlOp::Skip,
            args: vec![],
            binlog_pos: "mysql-bin.000001:500".to_string(),
        });
        assert!(resp.result, "{}", resp.msg);
        operate(&env.worker, TaskOp::Resume).await;

        env.upstream.push(query(500, "DROP TABLE orders"));
        env.upstream.push(ReplicationEvent::Xid { position: pos(600) });
        wait_status(&env.worker, |s| total_jobs(s) == 4).await;

        let jobs = env.sink.jobs();
        assert_eq!(jobs.len(), 4);
        assert!(!jobs.iter().any(|j| matches!(j, Job::Ddl { position, .. } if position == &pos(500))));
        assert_eq!(env.upstream.opened().len(), 1);

        operate(&env.worker, TaskOp::Stop).await;
        let status = wait_status(&env.worker, |s| s.stage == Stage::Stopped).await;
        assert_eq!(status.unit, Some(UnitType::Sync));
        assert_eq!(env.sink.close_count(), 1);
        assert!(env.source.close_count() >= 1);

        env.worker.close().await;
        assert_eq!(env.sink.close_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_check_pauses() {
        let env = env(source("STATEMENT"), MockStreamerProvider::new());
        let resp = env.worker.start_sub_task(&StartSubTaskRequest { task: TASK.to_string() }).await;
        assert!(resp.result, "{}", resp.msg);

        let status = wait_status(&env.worker, |s| s.stage == Stage::Paused).await;
        assert_eq!(status.unit, Some(UnitType::Check));
        let result = status.result.unwrap();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].error_type, ErrorType::CheckFailed);
        assert!(result.errors[0].raw_cause.contains("binlog_format"));
        match status.status {
            UnitStatus::Check(s) => {
                assert!(!s.passed);
                assert_eq!(s.failed, 1);
            }
            other => panic!("unexpected status {:?}", other),
        }
        assert!(env.upstream.opened().is_empty());

        env.worker.close().await;
    }

    #[tokio::test]
    async fn test_stream_end_pauses() {
        let env = env(source("ROW"), MockStreamerProvider::ending());
        let resp = env.worker.start_sub_task(&StartSubTaskRequest { task: TASK.to_string() }).await;
        assert!(resp.result, "{}", resp.msg);

        let status = wait_status(&env.worker, |s| s.stage == Stage::Paused).await;
        assert_eq!(status.unit, Some(UnitType::Sync));
        let result = status.result.unwrap();
        assert!(!result.is_canceled);
        assert_eq!(result.errors[0].error_type, ErrorType::UnknownError);

        env.worker.close().await;
        assert_eq!(env.sink.close_count(), 1);
    }
}
