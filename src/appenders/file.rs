//! File sink implementation

use super::buffered::BufferedWriter;
use crate::core::{LoggerError, Result, Sink};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Open `path` for appending, creating the file and its parent directory
/// when missing.
pub fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Buffered sink over an append-mode file.
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufferedWriter<File>>,
}

impl FileSink {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = open_append(&path).map_err(|e| {
            LoggerError::io_operation("opening log file", path.display().to_string(), e)
        })?;
        Ok(Self::from_file(path, file))
    }

    /// Wrap an already opened handle.
    pub fn from_file(path: impl Into<PathBuf>, file: File) -> Self {
        Self {
            path: path.into(),
            writer: Some(BufferedWriter::new(file)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> Result<&mut BufferedWriter<File>> {
        self.writer.as_mut().ok_or(LoggerError::LoggerStopped)
    }
}

impl Sink for FileSink {
    fn write(&mut self, line: &[u8]) -> Result<()> {
        self.writer()?.write(line)
    }

    fn flush(&mut self) -> Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }

    fn buffered(&self) -> usize {
        self.writer.as_ref().map_or(0, BufferedWriter::buffered)
    }

    /// Flush and release the file handle.
    fn close(&mut self) -> Result<()> {
        match self.writer.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
