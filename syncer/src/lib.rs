pub mod event;
#[cfg(any(test, feature = "mock_api"))]
pub mod mock;
pub mod operator;
pub mod sync_filter;
pub mod syncer;

pub use event::{BinlogPosition, EventSink, Job, ReplicationEvent, SinkProvider, Streamer, StreamerProvider};
pub use sync_filter::SyncFilter;
pub use syncer::Syncer;
