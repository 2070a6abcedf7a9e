//! One fully built logging configuration
//!
//! An engine owns its appenders, its targets and, when built from a file
//! with a non-zero refresh rate, a watcher thread polling that file's
//! modification time. Engines are immutable once built; a configuration
//! change builds a new engine and the registry swaps it in.

use super::appender::{Appender, AppenderKind};
use super::config::{AppenderConfig, Config, LoggerConfig};
use super::diagnostics;
use super::error::{LoggerError, Result};
use super::level::Level;
use super::metrics::{self, LoggerMetrics};
use super::target::{Target, DISCARD_TARGET, ROOT_TARGET};
use crossbeam_channel::{bounded, select, tick, Sender};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

/// Invoked by the watcher when the configuration file changes
pub type ReloadHook = Box<dyn Fn(&Path) + Send + 'static>;

struct Watcher {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct Engine {
    config_path: Option<PathBuf>,
    config: Option<Config>,
    refresh_rate: u64,
    root: Arc<Target>,
    discard: Arc<Target>,
    targets: HashMap<String, Arc<Target>>,
    appenders: BTreeMap<String, Arc<Appender>>,
    watcher: Mutex<Option<Watcher>>,
    closed: AtomicBool,
    metrics: &'static LoggerMetrics,
}

impl Engine {
    /// Engine with a silent root and discard target and no appenders.
    pub fn noop() -> Self {
        Self {
            config_path: None,
            config: None,
            refresh_rate: 0,
            root: Arc::new(Target::silent(ROOT_TARGET)),
            discard: Arc::new(Target::silent(DISCARD_TARGET)),
            targets: HashMap::new(),
            appenders: BTreeMap::new(),
            watcher: Mutex::new(None),
            closed: AtomicBool::new(false),
            metrics: metrics::global(),
        }
    }

    /// Validate `config`, start every appender and build the targets.
    ///
    /// Nothing is left running on error. `config_path` is remembered for
    /// [`Engine::watch`] and reopening.
    pub fn build(config: Config, config_path: Option<PathBuf>) -> Result<Self> {
        config.validate()?;

        let mut appenders = BTreeMap::new();
        for (name, spec) in &config.appenders {
            match start_appender(name, spec) {
                Ok(appender) => {
                    appenders.insert(name.clone(), Arc::new(appender));
                }
                Err(e) => {
                    for started in appenders.values() {
                        started.close(true);
                    }
                    return Err(e);
                }
            }
        }

        let build_target = |name: &str, spec: &LoggerConfig, root: Option<&Arc<Target>>| {
            let mut builder = Target::builder(name)
                .level(spec.parsed_level(name)?)
                .multiline(spec.multiline);
            if let Some(root) = root {
                builder = builder.additive(spec.additive).root(Arc::clone(root));
            }
            for appender in &spec.appenders {
                let bound = appenders.get(appender).ok_or_else(|| {
                    LoggerError::unknown_appender(name, appender, config.appender_names())
                })?;
                builder = builder.appender(Arc::clone(bound));
            }
            Ok::<_, LoggerError>(builder.build())
        };

        let targets = build_target(ROOT_TARGET, &config.root, None).and_then(|root| {
            let root = Arc::new(root);
            let mut targets = HashMap::with_capacity(config.loggers.len());
            for (name, spec) in &config.loggers {
                targets.insert(name.clone(), Arc::new(build_target(name, spec, Some(&root))?));
            }
            Ok((root, targets))
        });
        let (root, targets) = match targets {
            Ok(built) => built,
            Err(e) => {
                for appender in appenders.values() {
                    appender.close(true);
                }
                return Err(e);
            }
        };

        let metrics = metrics::global();
        metrics.record_engine_started();
        diagnostics::debug(format_args!(
            "engine started: {} appenders, {} targets",
            appenders.len(),
            targets.len() + 1
        ));

        Ok(Self {
            config_path,
            refresh_rate: config.refresh_rate,
            config: Some(config),
            root,
            discard: Arc::new(Target::silent(DISCARD_TARGET)),
            targets,
            appenders,
            watcher: Mutex::new(None),
            closed: AtomicBool::new(false),
            metrics,
        })
    }

    /// Start polling the configuration file, calling `on_change` whenever its
    /// modification time moves.
    ///
    /// Does nothing without a configuration path, with a refresh rate of 0,
    /// or if a watcher is already running.
    pub fn watch(&self, on_change: ReloadHook) -> Result<()> {
        let Some(path) = self.config_path.clone() else {
            return Ok(());
        };
        if self.refresh_rate == 0 || self.is_closed() {
            return Ok(());
        }

        let mut slot = self.watcher.lock();
        if slot.is_some() {
            return Ok(());
        }

        let (stop, stopped) = bounded::<()>(1);
        let interval = Duration::from_secs(self.refresh_rate);
        let handle = thread::Builder::new()
            .name("log-config-watcher".to_string())
            .spawn(move || {
                let ticker = tick(interval);
                let mut last = modified(&path);
                loop {
                    select! {
                        recv(stopped) -> _ => break,
                        recv(ticker) -> _ => {
                            let current = modified(&path);
                            if current != last {
                                last = current;
                                diagnostics::debug(format_args!("config '{}' changed", path.display()));
                                on_change(&path);
                            }
                        },
                    }
                }
                diagnostics::debug(format_args!("watcher for '{}' stopped", path.display()));
            })
            .map_err(|e| LoggerError::io_operation("spawning config watcher", "log-config-watcher", e))?;

        *slot = Some(Watcher { stop, handle });
        Ok(())
    }

    /// Target named `name`, or the discard target when there is none.
    pub fn target(&self, name: &str) -> &Arc<Target> {
        if name == ROOT_TARGET {
            return &self.root;
        }
        self.targets.get(name).unwrap_or(&self.discard)
    }

    pub fn root(&self) -> &Arc<Target> {
        &self.root
    }

    /// Root target's threshold
    pub fn level(&self) -> Level {
        self.root.level()
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Configuration this engine was built from; `None` for the no-op engine
    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    pub fn refresh_rate(&self) -> u64 {
        self.refresh_rate
    }

    pub fn appender(&self, name: &str) -> Option<&Arc<Appender>> {
        self.appenders.get(name)
    }

    pub fn appenders(&self) -> impl Iterator<Item = &Arc<Appender>> {
        self.appenders.values()
    }

    /// Names of every configured target, root included
    pub fn target_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(String::as_str).collect();
        names.push(ROOT_TARGET);
        names.sort_unstable();
        names
    }

    /// Ask every appender to flush. Does not wait.
    pub fn flush(&self) {
        for appender in self.appenders.values() {
            appender.flush();
        }
    }

    /// Stop the watcher and every appender. Only the first call has effect.
    pub fn close(&self, wait: bool) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(watcher) = self.watcher.lock().take() {
            drop(watcher.stop);
            if wait && watcher.handle.thread().id() != thread::current().id() {
                if watcher.handle.join().is_err() {
                    diagnostics::error(format_args!("config watcher panicked"));
                }
            }
        }

        for appender in self.appenders.values() {
            appender.close(wait);
        }

        if self.config.is_some() {
            self.metrics.record_engine_closed();
        }
        diagnostics::debug(format_args!("engine closed (wait={})", wait));
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.close(false);
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config_path", &self.config_path)
            .field("refresh_rate", &self.refresh_rate)
            .field("targets", &self.target_names())
            .field("appenders", &self.appenders.keys().collect::<Vec<_>>())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn start_appender(name: &str, spec: &AppenderConfig) -> Result<Appender> {
    let kind: AppenderKind = spec
        .kind
        .parse()
        .map_err(|_| LoggerError::unknown_kind(name, &spec.kind, AppenderKind::valid_names()))?;

    match kind {
        AppenderKind::Console => Appender::console(name, spec.pattern.as_str()),
        AppenderKind::File => {
            let path = spec
                .path
                .as_ref()
                .ok_or_else(|| LoggerError::missing_path(name))?;
            Appender::file(name, spec.pattern.as_str(), path)
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}
