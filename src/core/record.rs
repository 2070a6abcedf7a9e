//! Pooled, reference-counted log records
//!
//! A [`Record`] is built once per accepted log call and then shared by every
//! appender the call is routed to. Cloning a handle bumps the holder count;
//! dropping (or [`Record::release`]) decrements it. The last holder hands the
//! record body back to its [`RecordPool`], so string buffers are reused across
//! log calls.

use super::diagnostics;
use super::level::Level;
use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use std::fmt::{self, Write as _};
use std::mem;
use std::ops::Deref;
use std::panic::Location;
use std::sync::atomic::{AtomicIsize, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Replacement for line breaks in single-line messages
pub const END_OF_LINE: &str = "<<EOL>>";

/// Bodies kept for reuse; anything released beyond this is freed.
pub const POOL_RETENTION: usize = 1024;

/// Number of trailing path components kept in rendered sources
const SOURCE_PATH_COMPONENTS: usize = 3;

static GLOBAL_POOL: OnceLock<RecordPool> = OnceLock::new();

/// Where a log call was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    file: &'static str,
    line: u32,
    function: Option<&'static str>,
}

impl SourceLocation {
    pub const fn new(file: &'static str, line: u32, function: &'static str) -> Self {
        Self {
            file,
            line,
            function: Some(function),
        }
    }

    /// Location of the outermost `#[track_caller]` frame.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
            function: None,
        }
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Renders `file:line@function`, or `file:line` when the function is unknown.
    fn write_to(&self, out: &mut String) {
        let _ = write!(out, "{}:{}", trim_path(self.file, SOURCE_PATH_COMPONENTS), self.line);
        if let Some(function) = self.function {
            let name = function.rsplit("::").next().unwrap_or(function);
            out.push('@');
            out.push_str(name);
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_to(&mut out);
        f.write_str(&out)
    }
}

/// Keep only the last `keep` components of a path.
fn trim_path(file: &str, keep: usize) -> &str {
    let mut seen = 0;
    for (idx, ch) in file.char_indices().rev() {
        if ch == '/' || ch == '\\' {
            seen += 1;
            if seen == keep {
                return &file[idx + 1..];
            }
        }
    }
    file
}

fn collapse_newlines(message: &str) -> String {
    message.replace("\r\n", "\n").replace('\n', END_OF_LINE)
}

/// The immutable body of a record.
#[derive(Debug, Clone, Default)]
pub struct RecordData {
    target: String,
    level: Level,
    created: DateTime<Local>,
    created_utc: DateTime<Utc>,
    source: String,
    message: String,
}

impl RecordData {
    fn fill(&mut self, at: DateTime<Utc>, event: Event<'_>) {
        self.target.clear();
        self.target.push_str(event.target);
        self.level = event.level;
        self.created_utc = at;
        self.created = at.with_timezone(&Local);
        self.source.clear();
        event.source.write_to(&mut self.source);

        self.message.clear();
        match event.args.as_str() {
            Some(literal) => self.message.push_str(literal),
            None => {
                let _ = self.message.write_fmt(event.args);
            }
        }
        if !event.multiline && self.message.contains('\n') {
            self.message = collapse_newlines(&self.message);
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn created(&self) -> &DateTime<Local> {
        &self.created
    }

    pub fn created_utc(&self) -> &DateTime<Utc> {
        &self.created_utc
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Everything a log call contributes to a record.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    pub target: &'a str,
    pub level: Level,
    pub source: SourceLocation,
    pub args: fmt::Arguments<'a>,
    /// Keep line breaks instead of replacing them with [`END_OF_LINE`]
    pub multiline: bool,
}

struct RecordNode {
    holders: AtomicIsize,
    data: RecordData,
    pool: RecordPool,
}

impl Drop for RecordNode {
    // Runs once, when the last `Arc` goes away.
    fn drop(&mut self) {
        let remaining = *self.holders.get_mut();
        if remaining != 0 {
            self.pool.violation(format_args!(
                "record returned to pool with holder count {}",
                remaining
            ));
        }
        self.pool.recycle(mem::take(&mut self.data));
    }
}

/// Shared handle to one log event.
///
/// Every handle counts as one holder. The body goes back to the pool exactly
/// once, when the last handle is released.
pub struct Record {
    node: Arc<RecordNode>,
}

impl Record {
    /// Current number of live handles.
    pub fn holders(&self) -> usize {
        self.node.holders.load(Ordering::Acquire).max(0) as usize
    }

    /// Give up this handle.
    pub fn release(self) {}
}

impl Deref for Record {
    type Target = RecordData;

    fn deref(&self) -> &RecordData {
        &self.node.data
    }
}

impl Clone for Record {
    fn clone(&self) -> Self {
        let previous = self.node.holders.fetch_add(1, Ordering::AcqRel);
        if previous <= 0 {
            self.node.pool.violation(format_args!(
                "record cloned with holder count {} (target '{}')",
                previous, self.node.data.target
            ));
        }
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl Drop for Record {
    fn drop(&mut self) {
        let previous = self.node.holders.fetch_sub(1, Ordering::AcqRel);
        if previous <= 0 {
            self.node.pool.violation(format_args!(
                "record released with holder count {} (target '{}')",
                previous, self.node.data.target
            ));
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("holders", &self.holders())
            .field("data", &self.node.data)
            .finish()
    }
}

/// Counters describing pool behaviour.
#[derive(Debug, Default)]
pub struct PoolStats {
    allocated: AtomicU64,
    reused: AtomicU64,
    recycled: AtomicU64,
    violations: AtomicU64,
}

impl PoolStats {
    /// Bodies created because the pool was empty
    pub fn allocated(&self) -> u64 {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Bodies taken back out of the pool
    pub fn reused(&self) -> u64 {
        self.reused.load(Ordering::Relaxed)
    }

    /// Bodies returned by their last holder
    pub fn recycled(&self) -> u64 {
        self.recycled.load(Ordering::Relaxed)
    }

    /// Lifecycle violations detected on clone or release
    pub fn violations(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }
}

struct PoolShared {
    free: Mutex<Vec<RecordData>>,
    retention: usize,
    stats: PoolStats,
}

/// Source of reusable record bodies.
#[derive(Clone)]
pub struct RecordPool {
    shared: Arc<PoolShared>,
}

impl RecordPool {
    pub fn new() -> Self {
        Self::with_retention(POOL_RETENTION)
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                free: Mutex::new(Vec::new()),
                retention,
                stats: PoolStats::default(),
            }),
        }
    }

    /// The pool shared by every engine in the process.
    pub fn global() -> &'static RecordPool {
        GLOBAL_POOL.get_or_init(RecordPool::new)
    }

    /// Build a record stamped with the current time. The returned handle is
    /// the only holder.
    pub fn acquire(&self, event: Event<'_>) -> Record {
        self.acquire_at(Utc::now(), event)
    }

    /// Build a record stamped with `at`.
    pub fn acquire_at(&self, at: DateTime<Utc>, event: Event<'_>) -> Record {
        let mut data = self.take();
        data.fill(at, event);
        Record {
            node: Arc::new(RecordNode {
                holders: AtomicIsize::new(1),
                data,
                pool: self.clone(),
            }),
        }
    }

    pub fn stats(&self) -> &PoolStats {
        &self.shared.stats
    }

    /// Bodies currently idle in the pool
    pub fn idle(&self) -> usize {
        self.shared.free.lock().len()
    }

    fn take(&self) -> RecordData {
        let pooled = self.shared.free.lock().pop();
        match pooled {
            Some(data) => {
                self.shared.stats.reused.fetch_add(1, Ordering::Relaxed);
                data
            }
            None => {
                self.shared.stats.allocated.fetch_add(1, Ordering::Relaxed);
                RecordData::default()
            }
        }
    }

    fn recycle(&self, data: RecordData) {
        self.shared.stats.recycled.fetch_add(1, Ordering::Relaxed);
        let mut free = self.shared.free.lock();
        if free.len() < self.shared.retention {
            free.push(data);
        }
    }

    fn violation(&self, args: fmt::Arguments<'_>) {
        self.shared.stats.violations.fetch_add(1, Ordering::Relaxed);
        diagnostics::critical(format_args!("record lifecycle violation: {}", args));
    }
}

impl Default for RecordPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordPool")
            .field("idle", &self.idle())
            .field("retention", &self.shared.retention)
            .finish()
    }
}
