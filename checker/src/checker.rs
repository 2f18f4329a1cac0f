use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use common::config::{DBConfig, SubTaskConfig, DEFAULT_CHECK_TIMEOUT_SECS};
use common::db::{Database, DatabaseProvider};
use common::err::CResult;
use common::lifecycle::Unit;
use common::model::process::{ErrorType, ProcessError, ProcessResult};
use common::model::status::{CheckStatus, UnitStatus, UnitType};
use filter::{Filter, RuleRouter};

use crate::check::{
    do_checks, BinlogEnableCheck, BinlogFormatCheck, BinlogRowImageCheck, Check, Results, ShardingTablesCheck,
    SourcePrivilegeCheck, TablesCheck,
};
use crate::fetch::fetch_target_do_tables;
use crate::sharding::ShardingMap;

const CHECK_FAILED_MSG: &str = "check was failed, please see detail";

/// Pre-check unit over one or more source instances that replicate into the same target.
pub struct Checker {
    cfgs: Vec<SubTaskConfig>,
    provider: Arc<dyn DatabaseProvider>,
    timeout: Duration,

    closed: AtomicBool,
    /// Every connection opened by `init`, closed once by `close`.
    dbs: Mutex<Vec<(DBConfig, Arc<dyn Database>)>>,
    check_list: RwLock<Vec<Arc<dyn Check>>>,
    result: RwLock<Option<Results>>,
}

impl Checker {
    pub fn new(cfgs: Vec<SubTaskConfig>, provider: Arc<dyn DatabaseProvider>) -> Self {
        let timeout = cfgs
            .iter()
            .map(|c| c.check_timeout())
            .max()
            .unwrap_or(Duration::from_secs(DEFAULT_CHECK_TIMEOUT_SECS));

        Checker {
            cfgs,
            provider,
            timeout,
            closed: AtomicBool::new(false),
            dbs: Mutex::new(vec![]),
            check_list: RwLock::new(vec![]),
            result: RwLock::new(None),
        }
    }

    pub fn check_count(&self) -> usize {
        self.check_list.read().map(|l| l.len()).unwrap_or(0)
    }

    async fn open(&self, cfg: &DBConfig) -> CResult<Arc<dyn Database>> {
        let db = self.provider.open(cfg).await?;
        self.dbs.lock()?.push((cfg.clone(), db.clone()));

        Ok(db)
    }

    fn store_result(&self, results: Results) {
        match self.result.write() {
            Ok(mut guard) => *guard = Some(results),
            Err(e) => error!("store check result error {}", e),
        }
    }
}

#[async_trait]
impl Unit for Checker {
    async fn init(&self) -> CResult<()> {
        let mut sharding = ShardingMap::new();
        let mut sources: HashMap<String, Arc<dyn Database>> = HashMap::new();
        let mut check_list: Vec<Arc<dyn Check>> = vec![];

        for cfg in &self.cfgs {
            let instance_id = cfg.from.instance_id();
            let bw = Filter::new(cfg.bw_list.clone())?;
            let router = RuleRouter::new(&cfg.route_rules)?;

            let source = self.open(&cfg.from).await?;
            self.open(&cfg.to).await?;

            let mapping = fetch_target_do_tables(&source, &bw, &router).await?;
            let mut check_tables: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for (target, tables) in &mapping {
                for table in tables {
                    check_tables.entry(table.schema.clone()).or_default().push(table.name.clone());
                    sharding.add(target, &instance_id, table);
                }
            }
            sources.insert(instance_id.clone(), source.clone());

            check_list.push(Arc::new(BinlogEnableCheck::new(source.clone(), &instance_id)));
            check_list.push(Arc::new(BinlogFormatCheck::new(source.clone(), &instance_id)));
            check_list.push(Arc::new(BinlogRowImageCheck::new(source.clone(), &instance_id)));
            check_list.push(Arc::new(SourcePrivilegeCheck::new(source.clone(), &instance_id)));
            check_list.push(Arc::new(TablesCheck::new(source, &instance_id, check_tables)));
        }

        for (target, shards) in sharding.merged_targets() {
            info!("target {} merges {} sharding tables", target, sharding.count(target));
            check_list.push(Arc::new(ShardingTablesCheck::new(target, sources.clone(), shards.clone())));
        }

        info!("checker initialized with {} checks", check_list.len());
        *self.check_list.write()? = check_list;

        Ok(())
    }

    async fn process(&self, token: CancellationToken, pr: mpsc::Sender<ProcessResult>) {
        let checks: Vec<Arc<dyn Check>> = match self.check_list.read() {
            Ok(list) => list.clone(),
            Err(e) => {
                error!("read check list error {}", e);
                vec![]
            }
        };

        let cctx = token.child_token();
        let deadline = {
            let cctx = cctx.clone();
            let timeout = self.timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                cctx.cancel();
            })
        };
        let results = do_checks(&cctx, &checks).await;
        deadline.abort();
        let is_canceled = cctx.is_cancelled();

        let detail = match serde_json::to_vec(&results) {
            Ok(detail) => detail,
            Err(e) => format!("marshal error {}", e).into_bytes(),
        };
        let mut errors = vec![];
        if !results.summary.passed {
            errors.push(
                ProcessError::new(ErrorType::CheckFailed, CHECK_FAILED_MSG)
                    .with_raw_cause(String::from_utf8_lossy(&detail)),
            );
        }
        info!(
            "pre-check done: {} checks, {} failed, {} warnings, canceled {}",
            results.summary.total, results.summary.failed, results.summary.warning, is_canceled
        );
        self.store_result(results);

        let result = ProcessResult {
            is_canceled,
            errors,
            detail,
        };
        if pr.send(result).await.is_err() {
            warn!("[checker] process result dropped, receiver closed");
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

        let dbs = match self.dbs.lock() {
            Ok(mut dbs) => std::mem::take(&mut *dbs),
            Err(e) => {
                error!("[checker] lock connections error {}", e);
                return;
            }
        };
        for (cfg, db) in dbs {
            if let Err(e) = db.close().await {
                error!("close db {:?} error {}", cfg, e);
            }
        }
    }

    fn pause(&self) {
        if self.closed.load(Ordering::SeqCst) {
            warn!("[checker] try to pause, but already closed");
        }
    }

    async fn resume(&self, token: CancellationToken, pr: mpsc::Sender<ProcessResult>) {
        if self.closed.load(Ordering::SeqCst) {
            warn!("[checker] try to resume, but already closed");
            return;
        }

        self.process(token, pr).await
    }

    fn unit_type(&self) -> UnitType {
        UnitType::Check
    }

    fn is_bounded(&self) -> bool {
        true
    }

    fn status(&self) -> UnitStatus {
        let guard = match self.result.read() {
            Ok(guard) => guard,
            Err(e) => return UnitStatus::Msg(format!("read check result error {}", e)),
        };
        let status = match guard.as_ref() {
            None => CheckStatus::default(),
            Some(res) => CheckStatus {
                passed: res.summary.passed,
                total: res.summary.total,
                successful: res.summary.successful,
                failed: res.summary.failed,
                warning: res.summary.warning,
                detail: serde_json::to_vec(res).unwrap_or_default(),
            },
        };

        UnitStatus::Check(status)
    }
}
