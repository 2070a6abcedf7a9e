//! Appenders: a bounded record queue drained by one dedicated worker thread
//!
//! Producers only enqueue. The worker owns the sink, formats every record,
//! and decides when buffered bytes reach the sink: on explicit request, on
//! shutdown, when the buffer overflows, and on a one-second tick.

use super::diagnostics;
use super::error::{LoggerError, Result};
use super::metrics::{self, LoggerMetrics};
use super::pattern::{self, FormatCache};
use super::record::Record;
use crate::appenders::{ConsoleSink, FileSink};
use crossbeam_channel::{bounded, select, tick, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Records an appender holds before producers block
pub const QUEUE_CAPACITY: usize = 1024;

/// Pending flush requests; further requests coalesce
pub const FLUSH_REQUEST_CAPACITY: usize = 10;

/// Period of the worker's flush heuristic
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Output end of an appender. Only ever touched by the appender's worker.
pub trait Sink: Send {
    /// Accept one formatted line.
    fn write(&mut self, line: &[u8]) -> Result<()>;

    /// Push buffered bytes to the destination.
    fn flush(&mut self) -> Result<()>;

    /// Bytes accepted but not yet flushed.
    fn buffered(&self) -> usize;

    /// Flush and release the destination.
    fn close(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppenderKind {
    Console,
    File,
}

impl AppenderKind {
    pub const ALL: [AppenderKind; 2] = [AppenderKind::Console, AppenderKind::File];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppenderKind::Console => "console",
            AppenderKind::File => "file",
        }
    }

    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(AppenderKind::as_str)
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl fmt::Display for AppenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppenderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Invalid appender kind: '{}', use: {}", s, Self::valid_names()))
    }
}

/// A named sink fed through a bounded queue.
pub struct Appender {
    name: String,
    kind: AppenderKind,
    pattern: String,
    is_utc: bool,
    path: Option<PathBuf>,
    /// Taken on close; the worker exits once the queue is empty and disconnected.
    queue: RwLock<Option<Sender<Record>>>,
    flush_requests: Sender<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
    metrics: &'static LoggerMetrics,
}

impl Appender {
    /// Start an appender writing to stdout.
    pub fn console(name: impl Into<String>, pattern: impl Into<String>) -> Result<Self> {
        Self::spawn(name, AppenderKind::Console, pattern, None, Box::new(ConsoleSink::new()))
    }

    /// Start an appender writing to `path`, creating the file if needed.
    pub fn file(
        name: impl Into<String>,
        pattern: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let path = path.into();
        let sink = FileSink::open(&path)?;
        Self::spawn(name, AppenderKind::File, pattern, Some(path), Box::new(sink))
    }

    /// Start an appender over an arbitrary sink.
    pub fn with_sink(
        name: impl Into<String>,
        kind: AppenderKind,
        pattern: impl Into<String>,
        sink: Box<dyn Sink>,
    ) -> Result<Self> {
        Self::spawn(name, kind, pattern, None, sink)
    }

    fn spawn(
        name: impl Into<String>,
        kind: AppenderKind,
        pattern: impl Into<String>,
        path: Option<PathBuf>,
        sink: Box<dyn Sink>,
    ) -> Result<Self> {
        let name = name.into();
        let pattern = pattern.into();
        let is_utc = pattern::is_utc(&pattern);
        let metrics = metrics::global();

        let (queue, records) = bounded(QUEUE_CAPACITY);
        let (flush_requests, flushes) = bounded(FLUSH_REQUEST_CAPACITY);

        let worker = Worker {
            name: name.clone(),
            pattern: pattern.clone(),
            is_utc,
            sink,
            cache: FormatCache::new(),
            line: String::with_capacity(256),
            metrics,
        };

        let handle = thread::Builder::new()
            .name(format!("log-appender-{}", name))
            .spawn(move || worker.run(records, flushes))
            .map_err(|e| LoggerError::io_operation("spawning appender worker", name.clone(), e))?;

        diagnostics::debug(format_args!("appender '{}' ({}) started", name, kind));

        Ok(Self {
            name,
            kind,
            pattern,
            is_utc,
            path,
            queue: RwLock::new(Some(queue)),
            flush_requests,
            worker: Mutex::new(Some(handle)),
            metrics,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AppenderKind {
        self.kind
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_utc(&self) -> bool {
        self.is_utc
    }

    /// File path, for file appenders
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Records waiting for the worker
    pub fn queued(&self) -> usize {
        self.queue.read().as_ref().map_or(0, Sender::len)
    }

    /// Hand a record to the worker, blocking while the queue is full.
    ///
    /// Returns false once the appender is closed; the record is then
    /// released and counted as dropped. An accepted record is always written.
    pub fn enqueue(&self, record: Record) -> bool {
        let queue = self.queue.read();
        let rejected = match queue.as_ref() {
            Some(sender) => match sender.send(record) {
                Ok(()) => None,
                Err(e) => Some(e.into_inner()),
            },
            None => Some(record),
        };
        drop(queue);

        match rejected {
            None => {
                self.metrics.record_enqueued();
                true
            }
            Some(record) => {
                self.metrics.record_dropped();
                record.release();
                false
            }
        }
    }

    /// Ask the worker to drain its queue and flush. Does not wait.
    pub fn flush(&self) {
        match self.flush_requests.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                diagnostics::debug(format_args!("flush on stopped appender '{}'", self.name));
            }
        }
    }

    /// Stop accepting records. The worker writes everything already queued,
    /// flushes and closes the sink. With `wait` the call returns only after
    /// the worker has exited.
    pub fn close(&self, wait: bool) {
        drop(self.queue.write().take());
        if !wait {
            return;
        }

        let Some(handle) = self.worker.lock().take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            diagnostics::error(format_args!("appender '{}' worker panicked", self.name));
        }
    }

    /// True once the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .map_or(true, JoinHandle::is_finished)
    }
}

impl fmt::Debug for Appender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Appender")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("pattern", &self.pattern)
            .field("queued", &self.queued())
            .finish()
    }
}

struct Worker {
    name: String,
    pattern: String,
    is_utc: bool,
    sink: Box<dyn Sink>,
    cache: FormatCache,
    line: String,
    metrics: &'static LoggerMetrics,
}

impl Worker {
    fn run(mut self, records: Receiver<Record>, flushes: Receiver<()>) {
        let ticker = tick(TICK_INTERVAL);

        let mut written: u64 = 0;
        let mut written_at_last_tick: u64 = 0;
        let mut shrank = false;
        let mut last_buffered = 0;

        loop {
            select! {
                recv(records) -> msg => match msg {
                    Ok(record) => {
                        self.write_record(record);
                        written += 1;

                        let buffered = self.sink.buffered();
                        if last_buffered == 0 {
                            last_buffered = buffered;
                        }
                        if buffered < last_buffered {
                            shrank = true;
                        }
                        last_buffered = buffered;
                    }
                    Err(_) => break,
                },
                recv(flushes) -> msg => {
                    if msg.is_err() {
                        break;
                    }
                    self.drain(&records);
                    self.flush();
                },
                recv(ticker) -> _ => {
                    // Idle since the last tick, or writing without the buffer ever draining.
                    if written == written_at_last_tick && self.sink.buffered() > 0 {
                        self.flush();
                    }
                    if !shrank && self.sink.buffered() > 0 {
                        self.flush();
                    }
                    shrank = false;
                    written_at_last_tick = written;
                },
            }
        }

        self.drain(&records);
        self.flush();
        if let Err(e) = self.sink.close() {
            diagnostics::error(format_args!("appender '{}' close failed: {}", self.name, e));
        }
        diagnostics::debug(format_args!("appender '{}' stopped after {} records", self.name, written));
    }

    fn drain(&mut self, records: &Receiver<Record>) {
        while let Ok(record) = records.try_recv() {
            self.write_record(record);
        }
    }

    fn write_record(&mut self, record: Record) {
        self.line.clear();
        pattern::format_into(&mut self.line, &self.pattern, self.is_utc, &record, &mut self.cache);
        record.release();

        if self.line.is_empty() {
            return;
        }
        match self.sink.write(self.line.as_bytes()) {
            Ok(()) => {
                self.metrics.record_written();
            }
            Err(e) => {
                self.metrics.record_flush_failure();
                diagnostics::error(format_args!("appender '{}' write failed: {}", self.name, e));
            }
        }
    }

    fn flush(&mut self) {
        let pending = self.sink.buffered();
        match self.sink.flush() {
            Ok(()) => {
                if pending > 0 {
                    self.metrics.record_flush();
                }
            }
            Err(e) => {
                self.metrics.record_flush_failure();
                diagnostics::error(format_args!("appender '{}' flush failed: {}", self.name, e));
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::appenders::BufferedWriter;
    use crate::core::level::Level;
    use crate::core::record::{Event, RecordPool, SourceLocation};
    use std::io::{self, Write};
    use std::sync::Arc;

    /// Cloneable in-memory destination for sink tests.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }

        pub(crate) fn lines(&self) -> Vec<String> {
            self.contents().lines().map(str::to_owned).collect()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    pub(crate) fn memory_appender(name: &str, pattern: &str) -> (Appender, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let sink = BufferedWriter::with_capacity(256, buffer.clone());
        let appender = Appender::with_sink(name, AppenderKind::File, pattern, Box::new(sink))
            .expect("Failed to start appender");
        (appender, buffer)
    }

    fn record(pool: &RecordPool, message: &str) -> Record {
        pool.acquire(Event {
            target: "root",
            level: Level::Info,
            source: SourceLocation::caller(),
            args: format_args!("{}", message),
            multiline: false,
        })
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("file".parse::<AppenderKind>().unwrap(), AppenderKind::File);
        let err = "syslog".parse::<AppenderKind>().unwrap_err();
        assert!(err.contains("console|file"));
    }

    #[test]
    fn test_close_drains_queue() {
        let pool = RecordPool::new();
        let (appender, buffer) = memory_appender("mem", "%M");

        for i in 0..100 {
            appender.enqueue(record(&pool, &format!("m{}", i)));
        }
        appender.close(true);

        let lines = buffer.lines();
        assert_eq!(lines.len(), 100);
        assert_eq!(lines[0], "m0");
        assert_eq!(lines[99], "m99");
        assert!(appender.is_finished());
        assert_eq!(pool.stats().recycled(), 100);
    }

    #[test]
    fn test_flush_request_reaches_sink() {
        let pool = RecordPool::new();
        let (appender, buffer) = memory_appender("mem", "[%L] %M");

        appender.enqueue(record(&pool, "hi"));
        appender.flush();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while buffer.contents().is_empty() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(buffer.contents(), "[INFO] hi\n");
        appender.close(true);
    }

    #[test]
    fn test_tick_flushes_idle_buffer() {
        let pool = RecordPool::new();
        let (appender, buffer) = memory_appender("mem", "%M");

        appender.enqueue(record(&pool, "tick"));
        thread::sleep(TICK_INTERVAL * 2 + Duration::from_millis(300));

        assert_eq!(buffer.contents(), "tick\n");
        appender.close(true);
    }

    #[test]
    fn test_tick_flushes_under_steady_traffic() {
        let pool = RecordPool::new();
        let buffer = SharedBuffer::default();
        let sink = BufferedWriter::with_capacity(4096, buffer.clone());
        let appender = Arc::new(
            Appender::with_sink("steady", AppenderKind::File, "%M", Box::new(sink))
                .expect("Failed to start appender"),
        );

        let producer = {
            let appender = Arc::clone(&appender);
            thread::spawn(move || {
                for i in 0..30 {
                    appender.enqueue(record(&pool, &format!("s{}", i)));
                    thread::sleep(Duration::from_millis(100));
                }
            })
        };

        // The buffer only grows, so no tick ever sees an idle appender.
        let started = std::time::Instant::now();
        let deadline = started + TICK_INTERVAL * 2 + Duration::from_millis(300);
        while buffer.contents().is_empty() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        let contents = buffer.contents();
        assert!(!contents.is_empty(), "nothing flushed after {:?}", started.elapsed());
        assert!(contents.starts_with("s0\n"));

        producer.join().expect("producer panicked");
        appender.close(true);
        assert_eq!(buffer.lines().len(), 30);
    }

    #[test]
    fn test_close_under_load_accounts_for_every_record() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 5_000;

        let pool = RecordPool::new();
        let (appender, buffer) = memory_appender("racing", "%M");
        let appender = Arc::new(appender);

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let appender = Arc::clone(&appender);
                let pool = pool.clone();
                thread::spawn(move || {
                    (0..PER_PRODUCER)
                        .filter(|i| appender.enqueue(record(&pool, &format!("{} {}", p, i))))
                        .count()
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(5));
        appender.close(true);

        let accepted: usize = handles
            .into_iter()
            .map(|h| h.join().expect("producer panicked"))
            .sum();
        assert_eq!(buffer.lines().len(), accepted);
        assert_eq!(pool.stats().recycled(), (PRODUCERS * PER_PRODUCER) as u64);
        assert_eq!(pool.stats().violations(), 0);
    }

    /// Sink that holds every write until the gate is dropped.
    struct GatedSink {
        gate: crossbeam_channel::Receiver<()>,
        inner: BufferedWriter<SharedBuffer>,
    }

    impl Sink for GatedSink {
        fn write(&mut self, line: &[u8]) -> Result<()> {
            let _ = self.gate.recv();
            self.inner.write(line)
        }

        fn flush(&mut self) -> Result<()> {
            self.inner.flush()
        }

        fn buffered(&self) -> usize {
            self.inner.buffered()
        }

        fn close(&mut self) -> Result<()> {
            self.inner.close()
        }
    }

    #[test]
    fn test_close_without_wait_returns_before_worker_exits() {
        let pool = RecordPool::new();
        let buffer = SharedBuffer::default();
        let (gate, gate_rx) = bounded::<()>(0);
        let sink = GatedSink {
            gate: gate_rx,
            inner: BufferedWriter::with_capacity(256, buffer.clone()),
        };
        let appender = Appender::with_sink("gated", AppenderKind::File, "%M", Box::new(sink))
            .expect("Failed to start appender");

        for i in 0..5 {
            assert!(appender.enqueue(record(&pool, &format!("g{}", i))));
        }
        appender.close(false);
        assert!(!appender.is_finished());
        assert!(!appender.enqueue(record(&pool, "late")));

        drop(gate);
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !appender.is_finished() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(appender.is_finished());
        assert_eq!(buffer.lines(), ["g0", "g1", "g2", "g3", "g4"]);
        assert_eq!(pool.stats().recycled(), 6);
    }

    #[test]
    fn test_enqueue_after_close_drops_record() {
        let pool = RecordPool::new();
        let (appender, buffer) = memory_appender("mem", "%M");
        appender.close(true);
        appender.close(true);

        assert!(!appender.enqueue(record(&pool, "late")));
        appender.flush();

        assert!(buffer.contents().is_empty());
        assert_eq!(pool.stats().recycled(), 1);
    }

    #[test]
    fn test_utc_detected_from_pattern() {
        let (appender, _) = memory_appender("mem", "%U %T %M");
        assert!(appender.is_utc());
        appender.close(true);
    }
}
