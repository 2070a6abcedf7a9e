//! Named routing targets
//!
//! A target owns a severity threshold and an ordered list of appenders. A
//! non-root target may also forward to the engine's root target when it is
//! additive; forwarding never goes deeper than that one level.

use super::appender::Appender;
use super::level::Level;
use super::record::{Event, Record, RecordPool, SourceLocation};
use std::fmt;
use std::sync::Arc;

/// Name of the target every engine routes unqualified calls to
pub const ROOT_TARGET: &str = "root";

/// Name of the appender-less target unknown names resolve to
pub const DISCARD_TARGET: &str = "discard_root";

pub struct Target {
    name: String,
    level: Level,
    multiline: bool,
    additive: bool,
    appenders: Vec<Arc<Appender>>,
    root: Option<Arc<Target>>,
    pool: RecordPool,
}

impl Target {
    /// A target with no appenders, accepting nothing below [`Level::Error`].
    pub fn silent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: Level::default(),
            multiline: false,
            additive: false,
            appenders: Vec::new(),
            root: None,
            pool: RecordPool::global().clone(),
        }
    }

    pub fn builder(name: impl Into<String>) -> TargetBuilder {
        TargetBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn multiline(&self) -> bool {
        self.multiline
    }

    pub fn additive(&self) -> bool {
        self.additive
    }

    pub fn appenders(&self) -> &[Arc<Appender>] {
        &self.appenders
    }

    pub fn root(&self) -> Option<&Arc<Target>> {
        self.root.as_ref()
    }

    fn forwards_to_root(&self) -> bool {
        self.additive && self.root.is_some()
    }

    /// Whether a call at `level` would reach any appender.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level && (!self.appenders.is_empty() || self.forwards_to_root())
    }

    /// Route one event. Disabled levels return before any record is built.
    pub fn log_at(&self, level: Level, source: SourceLocation, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }

        let record = self.pool.acquire(Event {
            target: &self.name,
            level,
            source,
            args,
            multiline: self.multiline,
        });

        self.write_record(&record);
        if self.additive {
            if let Some(root) = &self.root {
                root.write_record(&record);
            }
        }
        record.release();
    }

    /// Hand one holder of `record` to each bound appender.
    pub fn write_record(&self, record: &Record) {
        for appender in &self.appenders {
            appender.enqueue(record.clone());
        }
    }

    #[track_caller]
    #[inline]
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        self.log_at(level, SourceLocation::caller(), args);
    }

    #[track_caller]
    #[inline]
    pub fn fine(&self, args: fmt::Arguments<'_>) {
        self.log_at(Level::Fine, SourceLocation::caller(), args);
    }

    #[track_caller]
    #[inline]
    pub fn trace(&self, args: fmt::Arguments<'_>) {
        self.log_at(Level::Trace, SourceLocation::caller(), args);
    }

    #[track_caller]
    #[inline]
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log_at(Level::Debug, SourceLocation::caller(), args);
    }

    #[track_caller]
    #[inline]
    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log_at(Level::Info, SourceLocation::caller(), args);
    }

    #[track_caller]
    #[inline]
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log_at(Level::Warning, SourceLocation::caller(), args);
    }

    #[track_caller]
    #[inline]
    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log_at(Level::Error, SourceLocation::caller(), args);
    }

    #[track_caller]
    #[inline]
    pub fn critical(&self, args: fmt::Arguments<'_>) {
        self.log_at(Level::Critical, SourceLocation::caller(), args);
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("multiline", &self.multiline)
            .field("additive", &self.additive)
            .field(
                "appenders",
                &self.appenders.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .field("root", &self.root.as_ref().map(|r| r.name()))
            .finish()
    }
}

/// Builder for [`Target`]
///
/// # Example
///
/// ```
/// use hotswap_logger::{Level, Target};
///
/// let target = Target::builder("main")
///     .level(Level::Warning)
///     .additive(true)
///     .build();
///
/// assert!(!target.enabled(Level::Info));
/// ```
pub struct TargetBuilder {
    name: String,
    level: Level,
    multiline: bool,
    additive: bool,
    appenders: Vec<Arc<Appender>>,
    root: Option<Arc<Target>>,
    pool: Option<RecordPool>,
}

impl TargetBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: Level::default(),
            multiline: false,
            additive: false,
            appenders: Vec::new(),
            root: None,
            pool: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn multiline(mut self, multiline: bool) -> Self {
        self.multiline = multiline;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn additive(mut self, additive: bool) -> Self {
        self.additive = additive;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn appender(mut self, appender: Arc<Appender>) -> Self {
        self.appenders.push(appender);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn root(mut self, root: Arc<Target>) -> Self {
        self.root = Some(root);
        self
    }

    /// Draw records from `pool` instead of the process-wide pool
    #[must_use = "builder methods return a new value"]
    pub fn pool(mut self, pool: RecordPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn build(self) -> Target {
        Target {
            name: self.name,
            level: self.level,
            multiline: self.multiline,
            additive: self.additive,
            appenders: self.appenders,
            root: self.root,
            pool: self.pool.unwrap_or_else(|| RecordPool::global().clone()),
        }
    }
}
