//! The swappable slot holding the active engine
//!
//! Every log call snapshots the slot once and routes through that engine
//! for the rest of the call. Reloads build a complete engine off to the side,
//! swap it in, and close the superseded engine on a reaper thread after a
//! grace period so calls still holding the old snapshot finish cleanly.

use super::config::Config;
use super::diagnostics;
use super::engine::{Engine, ReloadHook};
use super::error::{LoggerError, Result};
use super::level::Level;
use super::metrics::{self, LoggerMetrics};
use super::record::SourceLocation;
use super::target::Target;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Delay before a superseded engine is closed
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

static GLOBAL_REGISTRY: OnceLock<Registry> = OnceLock::new();

struct RegistryInner {
    slot: ArcSwap<Engine>,
    reload_lock: Mutex<()>,
    closed: AtomicBool,
    reapers: Mutex<Vec<JoinHandle<()>>>,
    grace: Duration,
    metrics: &'static LoggerMetrics,
}

/// Handle to an engine slot. Clones share the slot.
///
/// # Example
///
/// ```no_run
/// use hotswap_logger::{Level, Registry};
///
/// let registry = Registry::new();
/// registry.init_file("log.yaml")?;
/// registry.target("net").info(format_args!("listening on {}", 8080));
/// registry.close(true);
/// # Ok::<(), hotswap_logger::LoggerError>(())
/// ```
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_grace_period(DEFAULT_GRACE_PERIOD)
    }

    pub fn with_grace_period(grace: Duration) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                slot: ArcSwap::from_pointee(Engine::noop()),
                reload_lock: Mutex::new(()),
                closed: AtomicBool::new(false),
                reapers: Mutex::new(Vec::new()),
                grace,
                metrics: metrics::global(),
            }),
        }
    }

    /// The registry behind the crate-level functions and macros.
    pub fn global() -> &'static Registry {
        GLOBAL_REGISTRY.get_or_init(Registry::new)
    }

    pub fn grace_period(&self) -> Duration {
        self.inner.grace
    }

    /// Snapshot of the active engine
    pub fn engine(&self) -> Arc<Engine> {
        self.inner.slot.load_full()
    }

    /// Target `name` in the active engine, or the discard target.
    pub fn target(&self, name: &str) -> Arc<Target> {
        Arc::clone(self.inner.slot.load().target(name))
    }

    #[track_caller]
    pub fn log(&self, target: &str, level: Level, args: fmt::Arguments<'_>) {
        self.log_at(target, level, SourceLocation::caller(), args);
    }

    /// Route one event through the active engine.
    pub fn log_at(
        &self,
        target: &str,
        level: Level,
        source: SourceLocation,
        args: fmt::Arguments<'_>,
    ) {
        let engine = self.inner.slot.load();
        engine.target(target).log_at(level, source, args);
    }

    /// Root level of the active engine
    pub fn level(&self) -> Level {
        self.inner.slot.load().level()
    }

    pub fn flush(&self) {
        self.inner.slot.load().flush();
    }

    /// Load, validate and activate the configuration file at `path`.
    ///
    /// On error the active engine keeps running untouched.
    pub fn init_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if self.is_closed() {
            return Err(LoggerError::LoggerStopped);
        }
        let config = Config::from_path(path).inspect_err(|_| {
            self.inner.metrics.record_reload_failure();
        })?;
        self.install(config, Some(path.to_path_buf()))
    }

    /// Activate `config` without a backing file. No watcher is started.
    pub fn init(&self, config: Config) -> Result<()> {
        self.install(config, None)
    }

    /// Rebuild the active engine from its own configuration.
    ///
    /// Ignored once the registry is closed or while the no-op engine is
    /// active. Failures are reported as diagnostics.
    pub fn reopen(&self) {
        if self.is_closed() {
            diagnostics::debug(format_args!("reopen ignored, registry closed"));
            return;
        }

        let engine = self.engine();
        let result = match (engine.config_path(), engine.config()) {
            (Some(path), _) => self.init_file(path),
            (None, Some(config)) => self.init(config.clone()),
            (None, None) => {
                diagnostics::debug(format_args!("reopen ignored, nothing configured"));
                return;
            }
        };
        if let Err(e) = result {
            diagnostics::error(format_args!("reopen failed: {}", e));
        }
    }

    /// Close the active engine. With `wait`, also wait for every pending
    /// grace-period close. Only the first call has effect.
    pub fn close(&self, wait: bool) {
        let engine = {
            let _serial = self.inner.reload_lock.lock();
            if self.inner.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            self.engine()
        };

        engine.close(wait);
        if wait {
            let reapers: Vec<_> = self.inner.reapers.lock().drain(..).collect();
            for reaper in reapers {
                if reaper.join().is_err() {
                    diagnostics::error(format_args!("engine reaper panicked"));
                }
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn install(&self, config: Config, path: Option<PathBuf>) -> Result<()> {
        let _serial = self.inner.reload_lock.lock();
        if self.is_closed() {
            return Err(LoggerError::LoggerStopped);
        }

        let engine = Engine::build(config, path)
            .and_then(|engine| {
                engine.watch(self.reload_hook())?;
                Ok(Arc::new(engine))
            })
            .inspect_err(|e| {
                self.inner.metrics.record_reload_failure();
                diagnostics::debug(format_args!("reload rejected: {}", e));
            })?;

        let previous = self.inner.slot.swap(engine);
        self.inner.metrics.record_reload();
        self.retire(previous);
        Ok(())
    }

    /// Close `engine` on a separate thread once the grace period is over.
    fn retire(&self, engine: Arc<Engine>) {
        let grace = self.inner.grace;
        let spawned = thread::Builder::new()
            .name("log-engine-reaper".to_string())
            .spawn({
                let engine = Arc::clone(&engine);
                move || {
                    thread::sleep(grace);
                    engine.close(true);
                }
            });

        match spawned {
            Ok(handle) => {
                let mut reapers = self.inner.reapers.lock();
                reapers.retain(|reaper| !reaper.is_finished());
                reapers.push(handle);
            }
            Err(e) => {
                diagnostics::warning(format_args!(
                    "cannot spawn engine reaper ({}), closing superseded engine now",
                    e
                ));
                engine.close(false);
            }
        }
    }

    fn reload_hook(&self) -> ReloadHook {
        let registry = Arc::downgrade(&self.inner);
        Box::new(move |path: &Path| {
            let Some(inner) = registry.upgrade() else {
                return;
            };
            match (Registry { inner }).init_file(path) {
                Ok(()) => diagnostics::debug(format_args!("reloaded '{}'", path.display())),
                Err(LoggerError::LoggerStopped) => {}
                Err(e) => diagnostics::error(format_args!(
                    "reload of '{}' failed, keeping active configuration: {}",
                    path.display(),
                    e
                )),
            }
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("engine", &self.engine())
            .field("closed", &self.is_closed())
            .field("grace", &self.inner.grace)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{AppenderConfig, LoggerConfig};
    use crate::core::target::DISCARD_TARGET;
    use std::fs;
    use tempfile::tempdir;

    const GRACE: Duration = Duration::from_millis(50);

    fn file_config(path: &Path, level: Level) -> Config {
        Config::new()
            .with_appender("file", AppenderConfig::file(path, "%L %M"))
            .with_root(LoggerConfig::new(level).with_appender("file"))
    }

    #[test]
    fn test_starts_with_noop_engine() {
        let registry = Registry::with_grace_period(GRACE);
        assert_eq!(registry.level(), Level::Error);
        assert_eq!(registry.target("main").name(), DISCARD_TARGET);
        registry.log("main", Level::Critical, format_args!("dropped"));
        registry.close(true);
    }

    #[test]
    fn test_init_swaps_engine() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let registry = Registry::with_grace_period(GRACE);

        registry.init(file_config(&path, Level::Info)).unwrap();
        let first = registry.engine();
        registry.log("root", Level::Info, format_args!("one"));

        registry.init(file_config(&path, Level::Debug)).unwrap();
        assert!(!Arc::ptr_eq(&first, &registry.engine()));
        assert_eq!(registry.level(), Level::Debug);
        registry.log("root", Level::Debug, format_args!("two"));

        registry.close(true);
        assert!(first.is_closed());

        // Each engine flushes on its own close, so only membership is fixed.
        let written = fs::read_to_string(&path).unwrap();
        let mut lines: Vec<&str> = written.lines().collect();
        lines.sort_unstable();
        assert_eq!(lines, ["DEBUG two", "INFO one"]);
    }

    #[test]
    fn test_failed_reload_keeps_engine() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let registry = Registry::with_grace_period(GRACE);
        registry.init(file_config(&path, Level::Info)).unwrap();
        let active = registry.engine();

        let broken = file_config(&path, Level::Info)
            .with_root(LoggerConfig::new(Level::Info).with_appender("nope"));
        assert!(registry.init(broken).is_err());
        assert!(Arc::ptr_eq(&active, &registry.engine()));
        assert!(!active.is_closed());

        registry.close(true);
    }

    #[test]
    fn test_superseded_engine_closed_after_grace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let registry = Registry::with_grace_period(Duration::from_millis(200));
        registry.init(file_config(&path, Level::Info)).unwrap();
        let first = registry.engine();

        registry.reopen();
        assert!(!first.is_closed());
        thread::sleep(Duration::from_millis(600));
        assert!(first.is_closed());

        registry.close(true);
    }

    #[test]
    fn test_close_without_wait_finishes_in_background() {
        const RECORDS: usize = 2_000;

        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let registry = Registry::with_grace_period(GRACE);
        registry.init(file_config(&path, Level::Info)).unwrap();
        let engine = registry.engine();

        for i in 0..RECORDS {
            registry.log("root", Level::Info, format_args!("n{}", i));
        }
        registry.close(false);
        assert!(registry.is_closed());
        assert!(engine.is_closed());

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            let lines = fs::read_to_string(&path).unwrap_or_default().lines().count();
            let finished = engine.appenders().all(|a| a.is_finished());
            if lines == RECORDS && finished {
                break;
            }
            assert!(
                std::time::Instant::now() < deadline,
                "{} of {} lines, workers finished: {}",
                lines,
                RECORDS,
                finished
            );
            thread::sleep(Duration::from_millis(10));
        }

        // Late calls reach the closed engine and are dropped.
        registry.log("root", Level::Info, format_args!("late"));
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), RECORDS);
        assert_eq!(written.lines().last(), Some(format!("INFO n{}", RECORDS - 1).as_str()));
    }

    #[test]
    fn test_closed_registry_refuses_reload() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("log.yaml");
        fs::write(&config_path, "root:\n  level: info\n").unwrap();

        let registry = Registry::with_grace_period(GRACE);
        registry.close(true);
        registry.close(true);
        registry.reopen();

        assert!(matches!(
            registry.init_file(&config_path),
            Err(LoggerError::LoggerStopped)
        ));
        assert!(matches!(
            registry.init(Config::new()),
            Err(LoggerError::LoggerStopped)
        ));
    }
}
