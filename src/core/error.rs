//! Error types for the logger system

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON configuration error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML configuration error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Configuration file could not be read or parsed
    #[error("Failed to load configuration from '{}'", path.display())]
    ConfigLoad {
        path: PathBuf,
        #[source]
        source: Box<LoggerError>,
    },

    /// Appender declared with a kind other than console or file
    #[error("Unknown kind '{kind}' in appender '{appender}', use: {valid}")]
    UnknownAppenderKind {
        appender: String,
        kind: String,
        valid: String,
    },

    /// File appender without a path
    #[error("Missing path in file appender '{appender}'")]
    MissingPath { appender: String },

    /// File appender whose path cannot be created or opened
    #[error("Cannot open path '{}' in appender '{appender}'", path.display())]
    OpenPath {
        appender: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Level name not recognized
    #[error("Unknown level '{level}' in logger '{logger}', use: {valid}")]
    UnknownLevel {
        logger: String,
        level: String,
        valid: String,
    },

    /// Logger references an appender that is not declared
    #[error("Unknown appender '{appender}' in logger '{logger}', use: [{valid}]")]
    UnknownAppender {
        logger: String,
        appender: String,
        valid: String,
    },

    /// Logger declared under a reserved name
    #[error("Logger name '{name}' is reserved")]
    ReservedLoggerName { name: String },

    /// Buffered bytes could not be written after every attempt
    #[error("Flush failed after {attempts} attempts")]
    FlushFailure {
        attempts: usize,
        #[source]
        source: std::io::Error,
    },

    /// Logger already stopped
    #[error("Logger already stopped")]
    LoggerStopped,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Wrap a read or parse failure with the configuration path
    pub fn config_load(path: impl Into<PathBuf>, source: LoggerError) -> Self {
        LoggerError::ConfigLoad {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub fn unknown_kind(
        appender: impl Into<String>,
        kind: impl Into<String>,
        valid: impl Into<String>,
    ) -> Self {
        LoggerError::UnknownAppenderKind {
            appender: appender.into(),
            kind: kind.into(),
            valid: valid.into(),
        }
    }

    pub fn missing_path(appender: impl Into<String>) -> Self {
        LoggerError::MissingPath {
            appender: appender.into(),
        }
    }

    pub fn open_path(
        appender: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::OpenPath {
            appender: appender.into(),
            path: path.into(),
            source,
        }
    }

    pub fn unknown_level(
        logger: impl Into<String>,
        level: impl Into<String>,
        valid: impl Into<String>,
    ) -> Self {
        LoggerError::UnknownLevel {
            logger: logger.into(),
            level: level.into(),
            valid: valid.into(),
        }
    }

    pub fn unknown_appender(
        logger: impl Into<String>,
        appender: impl Into<String>,
        valid: impl Into<String>,
    ) -> Self {
        LoggerError::UnknownAppender {
            logger: logger.into(),
            appender: appender.into(),
            valid: valid.into(),
        }
    }

    pub fn reserved_name(name: impl Into<String>) -> Self {
        LoggerError::ReservedLoggerName { name: name.into() }
    }

    pub fn flush_failure(attempts: usize, source: std::io::Error) -> Self {
        LoggerError::FlushFailure { attempts, source }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// True for errors raised while validating or loading configuration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LoggerError::ConfigLoad { .. }
                | LoggerError::UnknownAppenderKind { .. }
                | LoggerError::MissingPath { .. }
                | LoggerError::OpenPath { .. }
                | LoggerError::UnknownLevel { .. }
                | LoggerError::UnknownAppender { .. }
                | LoggerError::ReservedLoggerName { .. }
                | LoggerError::YamlError(_)
                | LoggerError::JsonError(_)
        )
    }
}
