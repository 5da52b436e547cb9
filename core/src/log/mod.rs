//! Logger and logging macros
//!
//! The macros forward to the `log` facade. Binaries call [`init_logger`] once at startup,
//! tests may call [`try_init_logger`] repeatedly.

use appender::AppenderSpec;
use consts::{DEFAULT_LOGGER_ENV, ERR_LOG_FILE_NAME, LOG_FILE_NAME};
use log::LevelFilter;
use log4rs::{Config, config::Root};
use logger::Builder;
use std::sync::atomic::{AtomicBool, Ordering};

pub use log::{Level, LevelFilter as LogLevel};
pub use logger::LogError;

#[doc(hidden)]
pub use log as __private_log;

mod appender;
mod consts;
mod logger;

const CONSOLE_APPENDER: &str = "stdout";
const LOG_FILE_APPENDER: &str = "log_file";
const ERR_LOG_FILE_APPENDER: &str = "err_log_file";

static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global logger.
///
/// `filters` follows the `RUST_LOG` syntax (`info,dagcore_consensus=debug`) and is applied on top of
/// the `RUST_LOG` environment variable. When `log_dir` is provided, all records are additionally
/// written to a rolling log file and warnings and errors to a dedicated error log file.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> Result<(), LogError> {
    let loggers = Builder::new().root_level(LevelFilter::Info).parse_env(DEFAULT_LOGGER_ENV).parse_expression(filters).build();

    let mut appenders = vec![AppenderSpec::console(CONSOLE_APPENDER, None)];
    if let Some(log_dir) = log_dir {
        appenders.push(AppenderSpec::roller(LOG_FILE_APPENDER, None, log_dir, LOG_FILE_NAME)?);
        appenders.push(AppenderSpec::roller(ERR_LOG_FILE_APPENDER, Some(LevelFilter::Warn), log_dir, ERR_LOG_FILE_NAME)?);
    }
    let names = appenders.iter().map(|x| x.name).collect::<Vec<_>>();

    let config = Config::builder()
        .appenders(appenders.into_iter().map(|x| x.appender()))
        .loggers(loggers.items())
        .build(Root::builder().appenders(names).build(loggers.root_level()))
        .map_err(|err| LogError::ConfigError(err.to_string()))?;

    if LOGGER_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(LogError::AlreadyInitialized);
    }
    log4rs::init_config(config).map_err(|_| LogError::AlreadyInitialized)?;
    Ok(())
}

/// Console-only logger initialization which silently ignores repeated calls
pub fn try_init_logger(filters: &str) {
    let _ = init_logger(None, filters);
}

#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => (
        $crate::log::__private_log::trace!($($t)*)
    )
}

#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => (
        $crate::log::__private_log::debug!($($t)*)
    )
}

#[macro_export]
macro_rules! info {
    ($($t:tt)*) => (
        $crate::log::__private_log::info!($($t)*)
    )
}

#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => (
        $crate::log::__private_log::warn!($($t)*)
    )
}

#[macro_export]
macro_rules! error {
    ($($t:tt)*) => (
        $crate::log::__private_log::error!($($t)*)
    )
}
