use std::sync::Arc;

use checker::Checker;
use common::config::SubTaskConfig;
use common::db::DatabaseProvider;
use common::lifecycle::Unit;
use syncer::{SinkProvider, StreamerProvider, Syncer};

/// Builds the ordered units of a sub-task.
pub trait UnitFactory: Send + Sync {
    fn create_units(&self, cfg: &SubTaskConfig) -> Vec<Arc<dyn Unit>>;
}

/// Pre-check followed by binlog sync.
pub struct DefaultUnitFactory {
    db_provider: Arc<dyn DatabaseProvider>,
    streamer_provider: Arc<dyn StreamerProvider>,
    sink_provider: Arc<dyn SinkProvider>,
}

impl DefaultUnitFactory {
    pub fn new(
        db_provider: Arc<dyn DatabaseProvider>,
        streamer_provider: Arc<dyn StreamerProvider>,
        sink_provider: Arc<dyn SinkProvider>,
    ) -> Self {
        DefaultUnitFactory {
            db_provider,
            streamer_provider,
            sink_provider,
        }
    }
}

impl UnitFactory for DefaultUnitFactory {
    fn create_units(&self, cfg: &SubTaskConfig) -> Vec<Arc<dyn Unit>> {
        vec![
            Arc::new(Checker::new(vec![cfg.clone()], self.db_provider.clone())),
            Arc::new(Syncer::new(
                cfg.clone(),
                self.streamer_provider.clone(),
                self.sink_provider.clone(),
            )),
        ]
    }
}
