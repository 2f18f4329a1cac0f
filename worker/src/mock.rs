use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use common::config::SubTaskConfig;
use common::err::re_error::ReError;
use common::err::CResult;
use common::lifecycle::Unit;
use common::model::process::{ErrorType, ProcessError, ProcessResult};
use common::model::rpc::SqlOp;
use common::model::status::{UnitStatus, UnitType};

use crate::factory::UnitFactory;

/// Counts calls of every unit operation.
#[derive(Debug, Default)]
pub(crate) struct Calls {
    pub init: AtomicUsize,
    pub process: AtomicUsize,
    pub resume: AtomicUsize,
    pub pause: AtomicUsize,
    pub close: AtomicUsize,
    pub update: AtomicUsize,
    /// Runs currently in `process` or `resume`.
    pub active: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Bounded units answer with scripted results, success once the script is used up.
/// Unbounded units run until cancelled.
pub(crate) struct FakeUnit {
    unit_type: UnitType,
    bounded: bool,
    init_error: Option<String>,
    results: Mutex<VecDeque<ProcessResult>>,
    pub calls: Calls,
    pub sqls: Mutex<Vec<(SqlOp, Vec<String>, String)>>,
}

impl FakeUnit {
    pub fn check() -> Self {
        FakeUnit::new(UnitType::Check, true)
    }

    pub fn sync() -> Self {
        FakeUnit::new(UnitType::Sync, false)
    }

    fn new(unit_type: UnitType, bounded: bool) -> Self {
        FakeUnit {
            unit_type,
            bounded,
            init_error: None,
            results: Mutex::new(VecDeque::new()),
            calls: Calls::default(),
            sqls: Mutex::new(vec![]),
        }
    }

    pub fn failing_init(mut self, msg: &str) -> Self {
        self.init_error = Some(msg.to_string());
        self
    }

    /// Next run reports a failed check.
    pub fn failing_once(self) -> Self {
        self.results.lock().unwrap().push_back(ProcessResult {
            is_canceled: false,
            errors: vec![ProcessError::new(ErrorType::CheckFailed, "check was failed")],
            detail: vec![],
        });
        self
    }

    fn next_result(&self) -> ProcessResult {
        self.results.lock().unwrap().pop_front().unwrap_or_default()
    }

    async fn run(&self, token: CancellationToken, pr: mpsc::Sender<ProcessResult>) {
        self.calls.active.fetch_add(1, Ordering::SeqCst);
        let result = if self.bounded {
            self.next_result()
        } else {
            token.cancelled().await;
            ProcessResult {
                is_canceled: true,
                ..Default::default()
            }
        };
        self.calls.active.fetch_sub(1, Ordering::SeqCst);
        let _ = pr.send(result).await;
    }
}

#[async_trait]
impl Unit for FakeUnit {
    async fn init(&self) -> CResult<()> {
        self.calls.init.fetch_add(1, Ordering::SeqCst);
        match self.init_error.as_ref() {
            Some(msg) => Err(ReError::ConnectionError(msg.clone())),
            None => Ok(()),
        }
    }

    async fn process(&self, token: CancellationToken, pr: mpsc::Sender<ProcessResult>) {
        self.calls.process.fetch_add(1, Ordering::SeqCst);
        self.run(token, pr).await
    }

    async fn close(&self) {
        self.calls.close.fetch_add(1, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.calls.pause.fetch_add(1, Ordering::SeqCst);
    }

    async fn resume(&self, token: CancellationToken, pr: mpsc::Sender<ProcessResult>) {
        self.calls.resume.fetch_add(1, Ordering::SeqCst);
        self.run(token, pr).await
    }

    async fn update(&self, _cfg: &SubTaskConfig) -> CResult<()> {
        if self.unit_type != UnitType::Sync {
            return Err(ReError::Unsupported(format!("update of {:?} unit", self.unit_type)));
        }
        self.calls.update.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn handle_sql(&self, op: SqlOp, args: Vec<String>, binlog_pos: &str) -> CResult<()> {
        self.sqls.lock().unwrap().push((op, args, binlog_pos.to_string()));
        Ok(())
    }

    fn unit_type(&self) -> UnitType {
        self.unit_type
    }

    fn is_bounded(&self) -> bool {
        self.bounded
    }

    fn status(&self) -> UnitStatus {
        UnitStatus::Msg(format!("{:?}", self.unit_type))
    }
}

/// Hands out a check and a sync unit per sub-task and keeps them for inspection.
#[derive(Default)]
pub(crate) struct FakeFactory {
    pub created: Mutex<Vec<(String, Arc<FakeUnit>, Arc<FakeUnit>)>>,
    init_error: Option<String>,
}

impl FakeFactory {
    pub fn failing_init(msg: &str) -> Self {
        FakeFactory {
            init_error: Some(msg.to_string()),
            ..Default::default()
        }
    }

    pub fn units_of(&self, name: &str) -> (Arc<FakeUnit>, Arc<FakeUnit>) {
        let created = self.created.lock().unwrap();
        let (_, check, sync) = created.iter().rev().find(|(n, _, _)| n == name).unwrap();
        (check.clone(), sync.clone())
    }
}

impl UnitFactory for FakeFactory {
    fn create_units(&self, cfg: &SubTaskConfig) -> Vec<Arc<dyn Unit>> {
        let check = match self.init_error.as_ref() {
            Some(msg) => Arc::new(FakeUnit::check().failing_init(msg)),
            None => Arc::new(FakeUnit::check()),
        };
        let sync = Arc::new(FakeUnit::sync());
        self.created
            .lock()
            .unwrap()
            .push((cfg.name.clone(), check.clone(), sync.clone()));

        vec![check, sync]
    }
}
