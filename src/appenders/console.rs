//! Console sink implementation

use crate::core::{Result, Sink};
use std::io::{self, Write};

/// Unbuffered sink writing each line straight to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl Sink for ConsoleSink {
    fn write(&mut self, line: &[u8]) -> Result<()> {
        io::stdout().lock().write_all(line)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        io::stdout().flush()?;
        Ok(())
    }

    fn buffered(&self) -> usize {
        0
    }

    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}
