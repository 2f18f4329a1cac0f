use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use binlog::ast::QueryParser;
use common::config::SubTaskConfig;
use common::err::re_error::ReError;
use common::err::CResult;
use common::lifecycle::Unit;
use common::model::process::{ErrorType, ProcessError, ProcessResult};
use common::model::rpc::SqlOp;
use common::model::status::{SyncStatus, UnitStatus, UnitType};
use common::schema::QualifiedTable;
use filter::{RuleRouter, TableRouter};

use crate::event::{BinlogPosition, EventSink, Job, ReplicationEvent, SinkProvider, Streamer, StreamerProvider};
use crate::operator::{Operator, OperatorHolder};
use crate::sync_filter::SyncFilter;

/// Filters and routing rebuilt together on `update`.
struct FilterSet {
    filter: SyncFilter,
    router: RuleRouter,
}

impl FilterSet {
    fn from_config(cfg: &SubTaskConfig) -> CResult<FilterSet> {
        Ok(FilterSet {
            filter: SyncFilter::from_config(cfg)?,
            router: RuleRouter::new(&cfg.route_rules)?,
        })
    }
}

#[derive(Debug, Default)]
struct Counters {
    total_events: AtomicI64,
    skipped_events: AtomicI64,
    total_jobs: AtomicI64,
}

/// Binlog replication unit. It never finishes on its own: it runs until cancelled or
/// until an error pauses it.
pub struct Syncer {
    cfg: RwLock<SubTaskConfig>,
    streamer_provider: Arc<dyn StreamerProvider>,
    sink_provider: Arc<dyn SinkProvider>,

    rules: RwLock<Option<Arc<FilterSet>>>,
    sink: RwLock<Option<Arc<dyn EventSink>>>,
    /// Kept across pause and resume so no event is read twice.
    streamer: Mutex<Option<Box<dyn Streamer>>>,
    operators: OperatorHolder,

    closed: AtomicBool,
    /// Cancelled by `close`, ends any in-flight run so the stream can be dropped.
    shutdown: CancellationToken,
    counters: Counters,
    position: RwLock<BinlogPosition>,
}

impl Syncer {
    pub fn new(
        cfg: SubTaskConfig,
        streamer_provider: Arc<dyn StreamerProvider>,
        sink_provider: Arc<dyn SinkProvider>,
    ) -> Self {
        Syncer {
            cfg: RwLock::new(cfg),
            streamer_provider,
            sink_provider,
            rules: RwLock::new(None),
            sink: RwLock::new(None),
            streamer: Mutex::new(None),
            operators: OperatorHolder::new(),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            counters: Counters::default(),
            position: RwLock::new(BinlogPosition::default()),
        }
    }

    fn rules(&self) -> CResult<Arc<FilterSet>> {
        self.rules
            .read()?
            .clone()
            .ok_or_else(|| ReError::String("syncer is not initialized".to_string()))
    }

    fn sink(&self) -> CResult<Arc<dyn EventSink>> {
        self.sink
            .read()?
            .clone()
            .ok_or_else(|| ReError::String("syncer is not initialized".to_string()))
    }

    fn case_sensitive(&self) -> bool {
        self.cfg.read().map(|c| c.case_sensitive).unwrap_or(false)
    }

    fn set_position(&self, pos: &BinlogPosition) {
        if let Ok(mut guard) = self.position.write() {
            *guard = pos.clone();
        }
    }

    fn skipped(&self) {
        self.counters.skipped_events.fetch_add(1, Ordering::Relaxed);
    }

    async fn execute(&self, sink: &Arc<dyn EventSink>, job: Job) -> Result<(), ProcessError> {
        sink.execute(job)
            .await
            .map_err(|e| ProcessError::from_error(ErrorType::ExecSQL, &e))?;
        self.counters.total_jobs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Pulls events until cancelled. Only returns `Ok` on cancellation.
    async fn run(&self, token: &CancellationToken) -> Result<(), ProcessError> {
        let unknown = |e: ReError| ProcessError::from_error(ErrorType::UnknownError, &e);
        let rules = self.rules().map_err(unknown)?;
        let sink = self.sink().map_err(unknown)?;

        let mut streamer = self.streamer.lock().await;
        if self.shutdown.is_cancelled() {
            return Ok(());
        }
        if streamer.is_none() {
            let (from, pos) = {
                let cfg = self.cfg.read().map_err(|e| unknown(e.into()))?;
                let pos = self.position.read().map_err(|e| unknown(e.into()))?;
                (cfg.from.clone(), pos.clone())
            };
            info!("open binlog stream of {} from {}", from.instance_id(), pos);
            *streamer = Some(self.streamer_provider.open(&from, &pos).await.map_err(unknown)?);
        }
        let streamer = match streamer.as_mut() {
            Some(s) => s,
            None => return Err(unknown(ReError::String("binlog stream is not open".to_string()))),
        };

        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                _ = self.shutdown.cancelled() => return Ok(()),
                event = streamer.next_event() => event.map_err(unknown)?,
            };
            match event {
                Some(event) => self.handle_event(&rules, &sink, event).await?,
                None => {
                    return Err(ProcessError::new(
                        ErrorType::UnknownError,
                        "binlog stream ended unexpectedly",
                    ))
                }
            }
        }
    }

    async fn handle_event(
        &self,
        rules: &FilterSet,
        sink: &Arc<dyn EventSink>,
        event: ReplicationEvent,
    ) -> Result<(), ProcessError> {
        let unknown = |e: ReError| ProcessError::from_error(ErrorType::UnknownError, &e);

        match event {
            ReplicationEvent::Rotate { next } => {
                debug!("rotate to {}", next);
                self.set_position(&next);
            }
            ReplicationEvent::Xid { position } => {
                self.set_position(&position);
                self.execute(sink, Job::Xid { position }).await?;
            }
            ReplicationEvent::Query { position, schema, sql } => {
                self.counters.total_events.fetch_add(1, Ordering::Relaxed);
                self.set_position(&position);

                let sqls = match self.operators.take(&position).map_err(unknown)? {
                    Some(Operator::Skip) => {
                        info!("skip query at {} by operator: {}", position, sql);
                        self.skipped();
                        return Ok(());
                    }
                    Some(Operator::Replace(sqls)) => {
                        info!("replace query at {} by operator: {} => {:?}", position, sql, sqls);
                        sqls
                    }
                    None => vec![sql],
                };

                let mut ddls = vec![];
                for sql in sqls {
                    if self.keep_query(rules, &schema, &sql).map_err(|e| unknown(e.annotate(format!("query at {}", position))))? {
                        ddls.push(sql);
                    }
                }
                if ddls.is_empty() {
                    self.skipped();
                    return Ok(());
                }
                self.execute(sink, Job::Ddl { position, schema, sqls: ddls }).await?;
            }
            ReplicationEvent::Rows { position, event_type, schema, table, rows } => {
                self.counters.total_events.fetch_add(1, Ordering::Relaxed);
                self.set_position(&position);

                if rules.filter.skip_dml_event(&schema, &table, event_type).map_err(unknown)? {
                    self.skipped();
                    return Ok(());
                }
                let source = QualifiedTable::new(schema, table).to_lower();
                let (target_schema, target_table) = rules.router.route(&source.schema, &source.name).map_err(unknown)?;
                let job = Job::Dml {
                    position,
                    event: event_type.dml_event_type().map_err(unknown)?,
                    source,
                    target: QualifiedTable::new(target_schema, target_table),
                    rows,
                };
                self.execute(sink, job).await?;
            }
        }

        Ok(())
    }

    /// Whether one statement of a query event replicates.
    fn keep_query(&self, rules: &FilterSet, schema: &str, sql: &str) -> CResult<bool> {
        let sql = sql.trim();
        if SyncFilter::is_builtin_skip(sql) {
            return Ok(false);
        }

        let statements = match QueryParser::new(schema).parse(sql) {
            Ok(statements) => statements,
            Err(e) => {
                if rules.filter.skip_query(&[], sql)? {
                    return Ok(false);
                }
                return Err(e);
            }
        };

        let case_sensitive = self.case_sensitive();
        let mut keep = false;
        for mut stmt in statements {
            if !stmt.event.is_ddl() {
                // transaction control and the like, DML arrives as row events
                continue;
            }
            if !case_sensitive {
                stmt.tables = stmt.tables.iter().map(|t| t.to_lower()).collect();
            }
            if !rules.filter.skip_ddl_event(&stmt)? {
                keep = true;
            }
        }

        Ok(keep)
    }

    fn result(&self, token: &CancellationToken, outcome: Result<(), ProcessError>) -> ProcessResult {
        let errors = match outcome {
            Ok(()) => vec![],
            Err(e) => {
                error!("syncer stopped on error: {:?}", e);
                vec![e]
            }
        };

        ProcessResult {
            is_canceled: token.is_cancelled() || self.shutdown.is_cancelled(),
            errors,
            detail: vec![],
        }
    }
}

#[async_trait]
impl Unit for Syncer {
    async fn init(&self) -> CResult<()> {
        let (rules, to) = {
            let cfg = self.cfg.read()?;
            (FilterSet::from_config(&cfg)?, cfg.to.clone())
        };
        let sink = self.sink_provider.open(&to).await?;

        *self.rules.write()? = Some(Arc::new(rules));
        *self.sink.write()? = Some(sink);
        info!("syncer initialized, target {}", to.instance_id());

        Ok(())
    }

    async fn process(&self, token: CancellationToken, pr: mpsc::Sender<ProcessResult>) {
        let outcome = self.run(&token).await;
        let result = self.result(&token, outcome);

        if pr.send(result).await.is_err() {
            warn!("[syncer] process result dropped, receiver closed");
        }
    }

    async fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        self.shutdown.cancel();
        self.streamer.lock().await.take();

        let sink = match self.sink.write() {
            Ok(mut sink) => sink.take(),
            Err(e) => {
                error!("[syncer] lock sink error {}", e);
                None
            }
        };
        if let Some(sink) = sink {
            if let Err(e) = sink.close().await {
                error!("[syncer] close sink error {}", e);
            }
        }
        info!("syncer closed at {}", self.position.read().map(|p| p.to_string()).unwrap_or_default());
    }

    fn pause(&self) {
        if self.closed.load(Ordering::SeqCst) {
            warn!("[syncer] try to pause, but already closed");
        }
    }

    async fn resume(&self, token: CancellationToken, pr: mpsc::Sender<ProcessResult>) {
        if self.closed.load(Ordering::SeqCst) {
            warn!("[syncer] try to resume, but already closed");
            return;
        }

        self.process(token, pr).await
    }

    async fn update(&self, cfg: &SubTaskConfig) -> CResult<()> {
        let rules = FilterSet::from_config(cfg)?;
        *self.rules.write()? = Some(Arc::new(rules));

        let mut current = self.cfg.write()?;
        current.bw_list = cfg.bw_list.clone();
        current.route_rules = cfg.route_rules.clone();
        current.filter_rules = cfg.filter_rules.clone();
        current.case_sensitive = cfg.case_sensitive;
        info!("syncer rules of {} updated", current.name);

        Ok(())
    }

    fn handle_sql(&self, op: SqlOp, args: Vec<String>, binlog_pos: &str) -> CResult<()> {
        self.operators.set(op, args, binlog_pos)
    }

    fn unit_type(&self) -> UnitType {
        UnitType::Sync
    }

    fn is_bounded(&self) -> bool {
        false
    }

    fn status(&self) -> UnitStatus {
        UnitStatus::Sync(SyncStatus {
            total_events: self.counters.total_events.load(Ordering::Relaxed),
            skipped_events: self.counters.skipped_events.load(Ordering::Relaxed),
            total_jobs: self.counters.total_jobs.load(Ordering::Relaxed),
            sync_position: self.position.read().map(|p| p.to_string()).unwrap_or_default(),
        })
    }
}
