//! Sink implementations

pub mod buffered;
pub mod console;
pub mod file;

pub use buffered::{BufferedWriter, DEFAULT_BUFFER_SIZE, FLUSH_ATTEMPTS};
pub use console::ConsoleSink;
pub use file::{open_append, FileSink};

// Re-export traits for convenience
pub use crate::core::{Appender, Sink};
