use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use common::config::DBConfig;
use common::err::re_error::ReError;
use common::err::CResult;

use crate::event::{BinlogPosition, EventSink, Job, ReplicationEvent, SinkProvider, Streamer, StreamerProvider};

/// Upstream fed by the test. Once drained it waits for more events, or ends when
/// built with `ending`.
#[derive(Debug, Default)]
pub struct MockStreamerProvider {
    queue: Arc<Mutex<VecDeque<ReplicationEvent>>>,
    notify: Arc<Notify>,
    ends: bool,
    opened: Mutex<Vec<BinlogPosition>>,
    live: Arc<AtomicUsize>,
}

impl MockStreamerProvider {
    pub fn new() -> Self {
        MockStreamerProvider::default()
    }

    pub fn ending() -> Self {
        MockStreamerProvider {
            ends: true,
            ..Default::default()
        }
    }

    pub fn push(&self, event: ReplicationEvent) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(event);
        }
        self.notify.notify_waiters();
    }

    /// Start positions of every opened stream.
    pub fn opened(&self) -> Vec<BinlogPosition> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// Streams opened and not yet dropped.
    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

struct MockStreamer {
    queue: Arc<Mutex<VecDeque<ReplicationEvent>>>,
    notify: Arc<Notify>,
    ends: bool,
    live: Arc<AtomicUsize>,
}

impl Drop for MockStreamer {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Streamer for MockStreamer {
    async fn next_event(&mut self) -> CResult<Option<ReplicationEvent>> {
        loop {
            let notified = self.notify.notified();
            let next = self.queue.lock()?.pop_front();
            if let Some(event) = next {
                return Ok(Some(event));
            }
            if self.ends {
                return Ok(None);
            }
            notified.await;
        }
    }
}

#[async_trait]
impl StreamerProvider for MockStreamerProvider {
    async fn open(&self, _cfg: &DBConfig, from: &BinlogPosition) -> CResult<Box<dyn Streamer>> {
        self.opened.lock()?.push(from.clone());
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockStreamer {
            queue: self.queue.clone(),
            notify: self.notify.clone(),
            ends: self.ends,
            live: self.live.clone(),
        }))
    }
}

/// Records executed jobs. Fails DDL jobs containing `fail_on` when set.
#[derive(Debug, Default)]
pub struct MockSink {
    jobs: Mutex<Vec<Job>>,
    fail_on: Option<String>,
    close_count: AtomicUsize,
}

impl MockSink {
    pub fn new() -> Self {
        MockSink::default()
    }

    pub fn failing_on(sql: &str) -> Self {
        MockSink {
            fail_on: Some(sql.to_string()),
            ..Default::default()
        }
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().map(|j| j.clone()).unwrap_or_default()
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSink for MockSink {
    async fn execute(&self, job: Job) -> CResult<()> {
        if let (Some(fail_on), Job::Ddl { sqls, .. }) = (self.fail_on.as_ref(), &job) {
            if sqls.iter().any(|s| s.contains(fail_on.as_str())) {
                return Err(ReError::MysqlQueryErr(format!("execute {:?} failed", sqls)));
            }
        }
        self.jobs.lock()?.push(job);
        Ok(())
    }

    async fn close(&self) -> CResult<()> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out one shared sink.
pub struct MockSinkProvider {
    sink: Arc<MockSink>,
}

impl MockSinkProvider {
    pub fn new(sink: Arc<MockSink>) -> Self {
        MockSinkProvider { sink }
    }
}

#[async_trait]
impl SinkProvider for MockSinkProvider {
    async fn open(&self, _cfg: &DBConfig) -> CResult<Arc<dyn EventSink>> {
        Ok(self.sink.clone() as Arc<dyn EventSink>)
    }
}
