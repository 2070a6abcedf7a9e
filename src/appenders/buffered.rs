//! Fixed-capacity write buffer with bounded flush retries

use crate::core::diagnostics;
use crate::core::{LoggerError, Result, Sink};
use std::io::{self, Write};

/// Default buffer capacity (4 KB)
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Attempts made to land buffered bytes before giving up on them
pub const FLUSH_ATTEMPTS: usize = 3;

/// Byte buffer in front of a writer.
///
/// Payloads at least as large as the buffer bypass it. A flush that cannot
/// land every byte within [`FLUSH_ATTEMPTS`] writes fails with
/// [`LoggerError::FlushFailure`] and discards the buffered bytes, so a stuck
/// sink never grows memory.
///
/// # Example
///
/// ```
/// use hotswap_logger::appenders::BufferedWriter;
///
/// let mut writer = BufferedWriter::with_capacity(8, Vec::new());
/// writer.write(b"abc").unwrap();
/// assert_eq!(writer.buffered(), 3);
/// assert!(writer.get_ref().is_empty());
///
/// writer.flush().unwrap();
/// assert_eq!(writer.get_ref().as_slice(), b"abc");
/// ```
#[derive(Debug)]
pub struct BufferedWriter<W: Write> {
    buf: Box<[u8]>,
    len: usize,
    inner: W,
}

impl<W: Write> BufferedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, inner)
    }

    /// A capacity of zero falls back to [`DEFAULT_BUFFER_SIZE`].
    pub fn with_capacity(capacity: usize, inner: W) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            capacity
        };
        Self {
            buf: vec![0; capacity].into_boxed_slice(),
            len: 0,
            inner,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn available(&self) -> usize {
        self.buf.len() - self.len
    }

    pub fn buffered(&self) -> usize {
        self.len
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Buffer `payload`, flushing first when it does not fit.
    ///
    /// The payload is kept even when that flush fails; the flush error is
    /// still returned.
    pub fn write(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() >= self.capacity() {
            let flushed = self.flush();
            let direct = Self::write_with_retry(&mut self.inner, payload);
            return flushed.and(direct);
        }

        let flushed = if payload.len() > self.available() {
            self.flush()
        } else {
            Ok(())
        };

        self.buf[self.len..self.len + payload.len()].copy_from_slice(payload);
        self.len += payload.len();
        flushed
    }

    /// Write the buffered region to the inner writer. The buffer is empty
    /// afterwards whatever the outcome.
    pub fn flush(&mut self) -> Result<()> {
        if self.len == 0 {
            return Ok(());
        }
        let result = Self::write_with_retry(&mut self.inner, &self.buf[..self.len]);
        self.len = 0;
        result?;
        self.inner.flush()?;
        Ok(())
    }

    fn write_with_retry(inner: &mut W, bytes: &[u8]) -> Result<()> {
        let mut written = 0;
        let mut last_error = None;

        for attempt in 1..=FLUSH_ATTEMPTS {
            match inner.write(&bytes[written..]) {
                Ok(n) => {
                    written += n;
                    if written == bytes.len() {
                        return Ok(());
                    }
                    diagnostics::warning(format_args!(
                        "short write on attempt {}: {} of {} bytes",
                        attempt,
                        written,
                        bytes.len()
                    ));
                    last_error = Some(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("wrote {} of {} bytes", written, bytes.len()),
                    ));
                }
                Err(e) => {
                    diagnostics::warning(format_args!("write failed on attempt {}: {}", attempt, e));
                    last_error = Some(e);
                }
            }
        }

        Err(LoggerError::flush_failure(
            FLUSH_ATTEMPTS,
            last_error.unwrap_or_else(|| io::Error::from(io::ErrorKind::WriteZero)),
        ))
    }
}

impl<W: Write + Send> Sink for BufferedWriter<W> {
    fn write(&mut self, line: &[u8]) -> Result<()> {
        BufferedWriter::write(self, line)
    }

    fn flush(&mut self) -> Result<()> {
        BufferedWriter::flush(self)
    }

    fn buffered(&self) -> usize {
        self.len
    }

    fn close(&mut self) -> Result<()> {
        BufferedWriter::flush(self)
    }
}
