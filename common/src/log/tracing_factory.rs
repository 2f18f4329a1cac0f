use once_cell::sync::OnceCell;
use tracing::Level;
use tracing_subscriber::{fmt, FmtSubscriber};

/// Set once the global subscriber is installed.
static INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Clone, Default)]
pub struct TracingFactory {}

impl TracingFactory {
    /// Installs the global subscriber: DEBUG when `debug`, INFO otherwise.
    /// Only the first call has an effect.
    pub fn init_log(debug: bool) {
        INIT.get_or_init(|| {
            let format = fmt::format()
                .with_thread_ids(true)
                .compact();

            let level = if debug { Level::DEBUG } else { Level::INFO };
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .event_format(format)
                .finish();

            if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
                eprintln!("Unable to set global default subscriber: {err}");
            }
        });
    }

    pub fn is_init() -> bool {
        INIT.get().is_some()
    }
}
