//! Log setup for the `jigsaw` binary
//!
//! The subscriber is installed before the config file is read, with a
//! provisional filter taken from the flags alone. Once the config is loaded
//! the filter is swapped for `logging.level` (unless `--verbose` is set).

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

use super::config::LoggingConfig;

/// Handle for swapping the active filter after startup
pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Filter used while the config file is being read
pub fn provisional_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Filter for the rest of the run
pub fn configured_filter(verbose: bool, logging: &LoggingConfig) -> String {
    if verbose {
        "debug".to_string()
    } else {
        logging.level.clone()
    }
}

/// Build the stderr-style subscriber and the handle that narrows it later
pub fn subscriber<W>(verbose: bool, writer: W) -> (impl Subscriber + Send + Sync, FilterHandle)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (filter, handle) = reload::Layer::new(EnvFilter::new(provisional_filter(verbose)));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer));
    (subscriber, handle)
}

/// Switch to the level configured in `logging`
pub fn apply_config(
    handle: &FilterHandle,
    verbose: bool,
    logging: &LoggingConfig,
) -> Result<(), reload::Error> {
    handle.reload(EnvFilter::new(configured_filter(verbose, logging)))
}
