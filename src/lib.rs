//! # Hotswap Logger
//!
//! An in-process logging engine: leveled events are routed by target name to
//! console and file appenders, formatted and buffered on per-appender worker
//! threads, and the whole configuration can be replaced live from a file.
//!
//! ## Features
//!
//! - **Non-blocking pipeline**: callers only enqueue; each appender has its
//!   own worker that formats, buffers and flushes
//! - **Named targets**: per-target levels with additive forwarding to `root`
//! - **Hot reload**: a changed configuration file builds a new engine that is
//!   swapped in atomically, without losing in-flight records
//! - **Pooled records**: one reference-counted record per accepted call,
//!   shared by every appender it reaches
//!
//! ## Example
//!
//! ```no_run
//! use hotswap_logger::{info, warn};
//!
//! hotswap_logger::init_file("log.yaml")?;
//!
//! info!("service started on port {}", 8080);
//! warn!(target: "net", "peer {} is slow", "10.0.0.7");
//!
//! hotswap_logger::close(true);
//! # Ok::<(), hotswap_logger::LoggerError>(())
//! ```

pub mod appenders;
pub mod core;
pub mod macros;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub mod prelude {
    pub use crate::appenders::{BufferedWriter, ConsoleSink, FileSink};
    pub use crate::core::{
        Appender, AppenderConfig, AppenderKind, Config, Engine, Level, LoggerConfig, LoggerError,
        LoggerMetrics, Record, RecordPool, Registry, Result, Sink, SourceLocation, Target,
    };
    pub use crate::{critical, debug, error, fine, info, log, trace, warn};
}

pub use appenders::{BufferedWriter, ConsoleSink, FileSink};
pub use crate::core::{
    Appender, AppenderConfig, AppenderKind, Config, Engine, Event, FormatCache, Level,
    LoggerConfig, LoggerError, LoggerMetrics, PoolStats, Record, RecordData, RecordPool,
    Registry, Result, Sink, SourceLocation, Target, TargetBuilder, DEFAULT_GRACE_PERIOD,
    DISCARD_TARGET, FORMAT_ABBREV, FORMAT_DEFAULT, FORMAT_SHORT, ROOT_TARGET,
};

/// Log to `root` of the global registry at `level`.
#[track_caller]
pub fn log(level: Level, args: fmt::Arguments<'_>) {
    Registry::global().log(ROOT_TARGET, level, args);
}

#[track_caller]
pub fn fine(args: fmt::Arguments<'_>) {
    Registry::global().log(ROOT_TARGET, Level::Fine, args);
}

#[track_caller]
pub fn trace(args: fmt::Arguments<'_>) {
    Registry::global().log(ROOT_TARGET, Level::Trace, args);
}

#[track_caller]
pub fn debug(args: fmt::Arguments<'_>) {
    Registry::global().log(ROOT_TARGET, Level::Debug, args);
}

#[track_caller]
pub fn info(args: fmt::Arguments<'_>) {
    Registry::global().log(ROOT_TARGET, Level::Info, args);
}

#[track_caller]
pub fn warn(args: fmt::Arguments<'_>) {
    Registry::global().log(ROOT_TARGET, Level::Warning, args);
}

#[track_caller]
pub fn error(args: fmt::Arguments<'_>) {
    Registry::global().log(ROOT_TARGET, Level::Error, args);
}

#[track_caller]
pub fn critical(args: fmt::Arguments<'_>) {
    Registry::global().log(ROOT_TARGET, Level::Critical, args);
}

/// Root level of the active global engine
pub fn get_level() -> Level {
    Registry::global().level()
}

/// Target `name` of the active global engine; unknown names get the
/// discard target.
pub fn target(name: &str) -> Arc<Target> {
    Registry::global().target(name)
}

/// Ask every appender of the active global engine to flush.
pub fn flush() {
    Registry::global().flush();
}

/// Shut the global registry down. See [`Registry::close`].
pub fn close(wait: bool) {
    Registry::global().close(wait);
}

/// Rebuild the global engine from its configuration. See [`Registry::reopen`].
pub fn reopen() {
    Registry::global().reopen();
}

/// Load and activate a configuration file in the global registry.
pub fn init_file(path: impl AsRef<Path>) -> Result<()> {
    Registry::global().init_file(path)
}

/// Activate `config` in the global registry.
pub fn init(config: Config) -> Result<()> {
    Registry::global().init(config)
}

/// Process-wide pipeline counters
pub fn metrics() -> &'static LoggerMetrics {
    crate::core::metrics::global()
}
