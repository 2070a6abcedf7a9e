//! Core logger types and traits

pub mod appender;
pub mod config;
pub(crate) mod diagnostics;
pub mod engine;
pub mod error;
pub mod level;
pub mod metrics;
pub mod pattern;
pub mod record;
pub mod registry;
pub mod target;

pub use appender::{Appender, AppenderKind, Sink, QUEUE_CAPACITY};
pub use config::{AppenderConfig, Config, LoggerConfig};
pub use engine::Engine;
pub use error::{LoggerError, Result};
pub use level::Level;
pub use metrics::LoggerMetrics;
pub use pattern::{FormatCache, FORMAT_ABBREV, FORMAT_DEFAULT, FORMAT_SHORT};
pub use record::{Event, PoolStats, Record, RecordData, RecordPool, SourceLocation};
pub use registry::{Registry, DEFAULT_GRACE_PERIOD};
pub use target::{Target, TargetBuilder, DISCARD_TARGET, ROOT_TARGET};
