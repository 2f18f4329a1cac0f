use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::join_all;
use tracing::{error, info, instrument, warn};

use common::config::SubTaskConfig;
use common::err::re_error::ReError;
use common::err::CResult;
use common::model::rpc::{
    CommonWorkerResponse, HandleSubTaskSqlsRequest, OperateSubTaskRequest, OperateSubTaskResponse,
    QueryStatusRequest, QueryStatusResponse, StartSubTaskRequest, TaskOp, UpdateSubTaskRequest,
};
use common::model::status::SubTaskStatus;

use crate::factory::UnitFactory;
use crate::subtask::SubTask;

/// Handles sub-task requests of one worker process.
pub struct Worker {
    name: String,
    sub_tasks: DashMap<String, Arc<SubTask>>,
    factory: Arc<dyn UnitFactory>,
    closed: AtomicBool,
}

impl Worker {
    pub fn new(name: &str, factory: Arc<dyn UnitFactory>) -> Self {
        Worker {
            name: name.to_string(),
            sub_tasks: DashMap::new(),
            factory,
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn response(&self, r: CResult<()>) -> CommonWorkerResponse {
        match r {
            Ok(()) => CommonWorkerResponse::ok(&self.name),
            Err(e) => CommonWorkerResponse::fail(&self.name, e.to_string()),
        }
    }

    fn check_open(&self) -> CResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ReError::String(format!("worker {} already closed", self.name)));
        }
        Ok(())
    }

    fn sub_task(&self, name: &str) -> CResult<Arc<SubTask>> {
        self.sub_tasks
            .get(name)
            .map(|t| t.value().clone())
            .ok_or_else(|| ReError::SubTaskNotFound(name.to_string()))
    }

    #[instrument(skip_all)]
    pub async fn start_sub_task(&self, req: &StartSubTaskRequest) -> CommonWorkerResponse {
        let r = self.do_start_sub_task(req).await;
        if let Err(e) = &r {
            error!("start sub task error: {}", e);
        }
        self.response(r)
    }

    async fn do_start_sub_task(&self, req: &StartSubTaskRequest) -> CResult<()> {
        self.check_open()?;
        let cfg = SubTaskConfig::from_toml_str(&req.task)?;
        let task = Arc::new(SubTask::new(&cfg, self.factory.create_units(&cfg)));

        // a stopped or finished sub-task may be started again under its name
        match self.sub_tasks.entry(cfg.name.clone()) {
            Entry::Occupied(mut e) => {
                if !e.get().stage()?.is_terminal() {
                    return Err(ReError::SubTaskExists(cfg.name.clone()));
                }
                e.insert(task.clone());
            }
            Entry::Vacant(e) => {
                e.insert(task.clone());
            }
        }

        if let Err(e) = task.run().await {
            self.sub_tasks.remove_if(&cfg.name, |_, t| Arc::ptr_eq(t, &task));
            return Err(e);
        }
        info!("sub task {} started on worker {}", cfg.name, self.name);

        Ok(())
    }

    #[instrument(skip_all, fields(task = %req.name, op = ?req.op))]
    pub async fn operate_sub_task(&self, req: &OperateSubTaskRequest) -> OperateSubTaskResponse {
        let r = self.do_operate_sub_task(req).await;
        if let Err(e) = &r {
            warn!("{:?} sub task {} error: {}", req.op, req.name, e);
        }
        let resp = self.response(r);

        OperateSubTaskResponse {
            op: req.op,
            result: resp.result,
            worker: resp.worker,
            msg: resp.msg,
        }
    }

    async fn do_operate_sub_task(&self, req: &OperateSubTaskRequest) -> CResult<()> {
        self.check_open()?;
        let task = self.sub_task(&req.name)?;
        match req.op {
            TaskOp::Stop => task.stop().await,
            TaskOp::Pause => task.pause(),
            TaskOp::Resume => task.resume(),
        }
    }

    #[instrument(skip_all)]
    pub async fn update_sub_task(&self, req: &UpdateSubTaskRequest) -> CommonWorkerResponse {
        let r = self.do_update_sub_task(req).await;
        if let Err(e) = &r {
            warn!("update sub task error: {}", e);
        }
        self.response(r)
    }

    async fn do_update_sub_task(&self, req: &UpdateSubTaskRequest) -> CResult<()> {
        self.check_open()?;
        let cfg = SubTaskConfig::from_toml_str(&req.task)?;
        self.sub_task(&cfg.name)?.update(&cfg).await
    }

    /// Status of one sub-task, or of all of them sorted by name when `name` is empty.
    pub fn query_status(&self, req: &QueryStatusRequest) -> QueryStatusResponse {
        let statuses: CResult<Vec<SubTaskStatus>> = if req.name.is_empty() {
            let mut tasks: Vec<Arc<SubTask>> = self.sub_tasks.iter().map(|t| t.value().clone()).collect();
            tasks.sort_by(|a, b| a.name().cmp(b.name()));
            tasks.iter().map(|t| t.status()).collect()
        } else {
            self.sub_task(&req.name).and_then(|t| t.status()).map(|s| vec![s])
        };

        let (resp, sub_task_status) = match statuses {
            Ok(s) => (CommonWorkerResponse::ok(&self.name), s),
            Err(e) => (CommonWorkerResponse::fail(&self.name, e.to_string()), vec![]),
        };
        QueryStatusResponse {
            result: resp.result,
            worker: resp.worker,
            msg: resp.msg,
            sub_task_status,
            relay_status: None,
        }
    }

    pub fn handle_sqls(&self, req: &HandleSubTaskSqlsRequest) -> CommonWorkerResponse {
        let r = self
            .check_open()
            .and_then(|_| self.sub_task(&req.name))
            .and_then(|t| t.handle_sqls(req.op, req.args.clone(), &req.binlog_pos));
        if let Err(e) = &r {
            warn!("handle sqls of {} error: {}", req.name, e);
        }
        self.response(r)
    }

    /// Closes every sub-task. Later requests are refused.
    pub async fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        warn!("worker {} begin to close", self.name);
        let tasks: Vec<Arc<SubTask>> = self.sub_tasks.iter().map(|t| t.value().clone()).collect();
        join_all(tasks.iter().map(|t| t.close())).await;
        info!("worker {} closed {} sub tasks", self.name, tasks.len());
    }
}
