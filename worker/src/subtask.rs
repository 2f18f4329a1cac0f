use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use common::config::SubTaskConfig;
use common::err::re_error::ReError;
use common::err::CResult;
use common::lifecycle::Unit;
use common::model::process::ProcessResult;
use common::model::rpc::SqlOp;
use common::model::stage::{Stage, StageEvent};
use common::model::status::{SubTaskStatus, UnitType};

struct State {
    stage: Stage,
    /// Index of the unit owning the sub-task.
    current: usize,
    /// Last result of the current unit.
    result: Option<ProcessResult>,
    token: CancellationToken,
    /// Bumped on every process/resume, results of older runs are dropped.
    generation: u64,
}

/// One source instance replicated into the target by an ordered list of units.
///
/// The sub-task owns the [`Stage`]: units only report results, every stage change
/// goes through [`Stage::next`].
pub struct SubTask {
    name: String,
    units: Vec<Arc<dyn Unit>>,
    state: Mutex<State>,
    closed: AtomicBool,
}

impl SubTask {
    pub fn new(cfg: &SubTaskConfig, units: Vec<Arc<dyn Unit>>) -> Self {
        SubTask {
            name: cfg.name.clone(),
            units,
            state: Mutex::new(State {
                stage: Stage::New,
                current: 0,
                result: None,
                token: CancellationToken::new(),
                generation: 0,
            }),
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> CResult<Stage> {
        Ok(self.state.lock()?.stage)
    }

    fn transition(&self, state: &mut State, event: StageEvent, op: &str) -> CResult<()> {
        match state.stage.next(event) {
            Some(next) => {
                info!("sub task {} {}: {} -> {}", self.name, op, state.stage, next);
                state.stage = next;
                Ok(())
            }
            None => {
                warn!("sub task {} can not {} in stage {}", self.name, op, state.stage);
                Err(ReError::InvalidStage {
                    op: op.to_string(),
                    stage: state.stage,
                })
            }
        }
    }

    fn unit_at(&self, idx: usize) -> CResult<Arc<dyn Unit>> {
        self.units
            .get(idx)
            .cloned()
            .ok_or_else(|| ReError::String(format!("sub task {} has no unit {}", self.name, idx)))
    }

    /// Initializes every unit, then starts the first one.
    ///
    /// On an init error every unit is closed and the sub-task stays `New`.
    #[instrument(skip_all, fields(task = %self.name))]
    pub async fn run(self: &Arc<Self>) -> CResult<()> {
        {
            let state = self.state.lock()?;
            if state.stage != Stage::New {
                warn!("sub task {} already started, stage {}", self.name, state.stage);
                return Err(ReError::InvalidStage {
                    op: "start".to_string(),
                    stage: state.stage,
                });
            }
        }
        if self.units.is_empty() {
            return Err(ReError::String(format!("sub task {} has no unit", self.name)));
        }

        for unit in self.units.iter() {
            if let Err(e) = unit.init().await {
                error!("init {:?} unit of {} error: {}", unit.unit_type(), self.name, e);
                self.close().await;
                return Err(e.annotate(format!("init {:?} unit", unit.unit_type())));
            }
        }

        let mut state = self.state.lock()?;
        self.transition(&mut state, StageEvent::Init, "start")?;
        self.launch(&mut state, false)
    }

    /// Runs the current unit in the background and feeds its result back.
    ///
    /// Must be called with the state locked, in the same critical section as the stage
    /// change that asked for it. Any earlier run is cancelled.
    fn launch(self: &Arc<Self>, state: &mut State, resume: bool) -> CResult<()> {
        if state.stage != Stage::Running || self.closed.load(Ordering::SeqCst) {
            return Err(ReError::InvalidStage {
                op: "run unit".to_string(),
                stage: state.stage,
            });
        }
        let unit = self.unit_at(state.current)?;

        state.token.cancel();
        state.token = CancellationToken::new();
        state.generation += 1;
        let (idx, token, generation) = (state.current, state.token.clone(), state.generation);
        debug!("sub task {} runs {:?} unit, resume {}", self.name, unit.unit_type(), resume);

        let task = self.clone();
        tokio::spawn(async move {
            let (tx, mut rx) = mpsc::channel(1);
            if resume {
                unit.resume(token, tx).await;
            } else {
                unit.process(token, tx).await;
            }

            match rx.recv().await {
                Some(result) => task.on_result(idx, generation, result),
                None => warn!("{:?} unit of {} returned without result", unit.unit_type(), task.name),
            }
        });

        Ok(())
    }

    fn on_result(self: &Arc<Self>, idx: usize, generation: u64, result: ProcessResult) {
        let finished = {
            let mut state = match self.state.lock() {
                Ok(state) => state,
                Err(e) => {
                    error!("sub task {} lost a result: {}", self.name, e);
                    return;
                }
            };
            if state.generation != generation {
                debug!("sub task {} drops result of an outdated run", self.name);
                return;
            }
            state.result = Some(result.clone());
            if state.stage != Stage::Running {
                // paused or stopped from outside, this is the cancelled run
                return;
            }

            let bounded = self.units.get(idx).map(|u| u.is_bounded()).unwrap_or(false);
            if !result.errors.is_empty() || result.is_canceled {
                warn!("sub task {} unit {} failed: {:?}", self.name, idx, result.errors);
                let _ = self.transition(&mut state, StageEvent::Fail, "pause on error");
                false
            } else if !bounded {
                warn!("sub task {} unbounded unit {} returned without error", self.name, idx);
                let _ = self.transition(&mut state, StageEvent::Fail, "pause on unexpected return");
                false
            } else if idx + 1 < self.units.len() {
                state.current = idx + 1;
                state.result = None;
                if let Err(e) = self.launch(&mut state, false) {
                    error!("sub task {} can not start next unit: {}", self.name, e);
                }
                false
            } else {
                self.transition(&mut state, StageEvent::Finish, "finish").is_ok()
            }
        };

        if finished {
            let task = self.clone();
            tokio::spawn(async move { task.close().await });
        }
    }

    pub fn pause(&self) -> CResult<()> {
        let unit = {
            let mut state = self.state.lock()?;
            self.transition(&mut state, StageEvent::Pause, "pause")?;
            state.token.cancel();
            self.unit_at(state.current)?
        };
        unit.pause();

        Ok(())
    }

    pub fn resume(self: &Arc<Self>) -> CResult<()> {
        let mut state = self.state.lock()?;
        self.transition(&mut state, StageEvent::Resume, "resume")?;
        self.launch(&mut state, true)
    }

    /// Stops the sub-task for good. It stays visible as `Stopped`.
    pub async fn stop(&self) -> CResult<()> {
        {
            let mut state = self.state.lock()?;
            self.transition(&mut state, StageEvent::Stop, "stop")?;
            state.token.cancel();
        }
        self.close().await;

        Ok(())
    }

    /// Cancels the running unit and closes every unit, once.
    pub async fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        match self.state.lock() {
            Ok(state) => state.token.cancel(),
            Err(e) => error!("sub task {} lock state error {}", self.name, e),
        }
        join_all(self.units.iter().map(|u| u.close())).await;
        info!("sub task {} closed", self.name);
    }

    /// Applies a new config to the units that have not finished. Only while paused.
    pub async fn update(&self, cfg: &SubTaskConfig) -> CResult<()> {
        if cfg.name != self.name {
            return Err(ReError::String(format!("can not update sub task {} with config of {}", self.name, cfg.name)));
        }
        let current = {
            let state = self.state.lock()?;
            if state.stage != Stage::Paused {
                warn!("sub task {} can only be updated while paused, stage {}", self.name, state.stage);
                return Err(ReError::InvalidStage {
                    op: "update".to_string(),
                    stage: state.stage,
                });
            }
            state.current
        };

        for unit in self.units.iter().skip(current) {
            match unit.update(cfg).await {
                Ok(()) => {}
                Err(ReError::Unsupported(msg)) => debug!("{}, skipped", msg),
                Err(e) => return Err(e),
            }
        }
        info!("sub task {} updated", self.name);

        Ok(())
    }

    /// Hands a manual SQL operator to the sync unit.
    pub fn handle_sqls(&self, op: SqlOp, args: Vec<String>, binlog_pos: &str) -> CResult<()> {
        let stage = self.stage()?;
        if stage.is_terminal() {
            return Err(ReError::InvalidStage {
                op: "handle sqls".to_string(),
                stage,
            });
        }

        match self.units.iter().find(|u| u.unit_type() == UnitType::Sync) {
            Some(unit) => unit.handle_sql(op, args, binlog_pos),
            None => Err(ReError::Unsupported(format!("handle sqls of sub task {} without sync unit", self.name))),
        }
    }

    pub fn status(&self) -> CResult<SubTaskStatus> {
        let state = self.state.lock()?;
        let unit = self.units.get(state.current);

        Ok(SubTaskStatus {
            name: self.name.clone(),
            stage: state.stage,
            unit: match state.stage {
                Stage::Finished => None,
                _ => unit.map(|u| u.unit_type()),
            },
            result: state.result.clone(),
            status: unit.map(|u| u.status()).unwrap_or_default(),
        })
    }
}
