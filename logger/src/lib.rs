//! Logging utilities for the syndic crates, a thin layer over `tracing`.

mod config;

use std::{
    fs::OpenOptions,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use color_eyre::{
    eyre::{eyre, WrapErr as _},
    Result,
};
pub use config::{Configuration, Level};
use tracing::subscriber::set_global_default;
pub use tracing::{
    debug, debug_span, error, error_span, info, info_span, instrument as log, trace, trace_span,
    warn, warn_span, Instrument,
};
use tracing_subscriber::{layer::SubscriberExt, registry::Registry, Layer as _};

static LOGGER_SET: AtomicBool = AtomicBool::new(false);

fn try_set_logger() -> Result<()> {
    if LOGGER_SET
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(eyre!("Logger is already set."));
    }
    Ok(())
}

/// Initializes the logger globally with the given [`Configuration`].
///
/// Works only once per process, all subsequent invocations will fail.
///
/// For usage in tests consider [`init_test`].
///
/// # Errors
/// If the logger is already set, raises a generic error.
pub fn init_global(configuration: &Configuration) -> Result<()> {
    try_set_logger()?;

    let layer = if let Some(path) = &configuration.log_file_path {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .wrap_err_with(|| format!("Failed to open the log file {}", path.display()))?;
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Arc::new(file));
        if configuration.compact_mode {
            layer.compact().boxed()
        } else {
            layer.boxed()
        }
    } else {
        let layer = tracing_subscriber::fmt::layer().with_ansi(configuration.terminal_colors);
        if configuration.compact_mode {
            layer.compact().boxed()
        } else {
            layer.boxed()
        }
    };

    let level: tracing::Level = configuration.max_log_level.into();
    let level_filter = tracing_subscriber::filter::LevelFilter::from_level(level);
    let subscriber = Registry::default().with(layer).with(level_filter);
    set_global_default(subscriber)?;
    Ok(())
}

/// Initializes the logger for tests, ignoring double initialization.
pub fn init_test() {
    let configuration = Configuration {
        max_log_level: Level::DEBUG,
        compact_mode: true,
        terminal_colors: false,
        log_file_path: None,
    };
    let _result = init_global(&configuration);
}

/// Disables the logger globally, so that subsequent calls to [`init_global`] will fail.
///
/// # Errors
/// If the global logger was already initialised/disabled.
pub fn disable_global() -> Result<()> {
    try_set_logger()
}

/// The prelude re-exports the macros this crate is normally used through.
pub mod prelude {
    pub use tracing::{debug, error, info, trace, warn};
}
