//! Engine configuration
//!
//! Files are YAML, or JSON when the extension is `.json`:
//!
//! ```yaml
//! refresh_rate: 30
//! appenders:
//!   stdout:
//!     kind: console
//!     pattern: "[%D %T] [%L] %M"
//!   app:
//!     kind: file
//!     pattern: "[%D %T] [%L] [%C] (%s) %M"
//!     path: logs/app.log
//! root:
//!   level: info
//!   appenders: [stdout, app]
//! loggers:
//!   net:
//!     level: debug
//!     additive: true
//!     appenders: [app]
//! ```

use super::appender::AppenderKind;
use super::error::{LoggerError, Result};
use super::level::Level;
use super::target::{DISCARD_TARGET, ROOT_TARGET};
use crate::appenders::open_append;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between checks of the file's modification time; 0 disables
    pub refresh_rate: u64,
    pub appenders: BTreeMap<String, AppenderConfig>,
    pub root: LoggerConfig,
    pub loggers: BTreeMap<String, LoggerConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppenderConfig {
    pub kind: String,
    pub pattern: String,
    pub path: Option<PathBuf>,
}

impl AppenderConfig {
    pub fn console(pattern: impl Into<String>) -> Self {
        Self {
            kind: AppenderKind::Console.as_str().to_string(),
            pattern: pattern.into(),
            path: None,
        }
    }

    pub fn file(path: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            kind: AppenderKind::File.as_str().to_string(),
            pattern: pattern.into(),
            path: Some(path.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: String,
    pub multiline: bool,
    /// Also deliver to root's appenders; ignored on root itself
    pub additive: bool,
    pub appenders: Vec<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: Level::default().config_name().to_string(),
            multiline: false,
            additive: false,
            appenders: Vec::new(),
        }
    }
}

impl LoggerConfig {
    pub fn new(level: Level) -> Self {
        Self {
            level: level.config_name().to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_appender(mut self, name: impl Into<String>) -> Self {
        self.appenders.push(name.into());
        self
    }

    #[must_use]
    pub fn with_additive(mut self, additive: bool) -> Self {
        self.additive = additive;
        self
    }

    #[must_use]
    pub fn with_multiline(mut self, multiline: bool) -> Self {
        self.multiline = multiline;
        self
    }

    /// Parsed level; `logger` names the owner in the error.
    pub fn parsed_level(&self, logger: &str) -> Result<Level> {
        self.level
            .parse()
            .map_err(|_| LoggerError::unknown_level(logger, &self.level, Level::valid_names()))
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse a configuration file. Does not validate.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let load = || -> Result<Self> {
            let text = fs::read_to_string(path)?;
            let is_json = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            if is_json {
                Self::from_json_str(&text)
            } else {
                Self::from_yaml_str(&text)
            }
        };
        load().map_err(|e| LoggerError::config_load(path, e))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    #[must_use]
    pub fn with_refresh_rate(mut self, seconds: u64) -> Self {
        self.refresh_rate = seconds;
        self
    }

    #[must_use]
    pub fn with_appender(mut self, name: impl Into<String>, appender: AppenderConfig) -> Self {
        self.appenders.insert(name.into(), appender);
        self
    }

    #[must_use]
    pub fn with_root(mut self, root: LoggerConfig) -> Self {
        self.root = root;
        self
    }

    #[must_use]
    pub fn with_logger(mut self, name: impl Into<String>, logger: LoggerConfig) -> Self {
        self.loggers.insert(name.into(), logger);
        self
    }

    /// Check everything an engine needs before any worker is started.
    ///
    /// File appenders get their parent directory created and their file
    /// opened (and closed again) to prove the path is writable.
    pub fn validate(&self) -> Result<()> {
        for (name, appender) in &self.appenders {
            let kind: AppenderKind = appender.kind.parse().map_err(|_| {
                LoggerError::unknown_kind(name, &appender.kind, AppenderKind::valid_names())
            })?;

            if kind == AppenderKind::File {
                let path = appender
                    .path
                    .as_ref()
                    .filter(|p| !p.as_os_str().is_empty())
                    .ok_or_else(|| LoggerError::missing_path(name))?;
                open_append(path).map_err(|e| LoggerError::open_path(name, path, e))?;
            }
        }

        self.validate_logger(ROOT_TARGET, &self.root)?;

        for (name, logger) in &self.loggers {
            if name == ROOT_TARGET || name == DISCARD_TARGET {
                return Err(LoggerError::reserved_name(name));
            }
            self.validate_logger(name, logger)?;
        }

        Ok(())
    }

    fn validate_logger(&self, name: &str, logger: &LoggerConfig) -> Result<()> {
        logger.parsed_level(name)?;
        for appender in &logger.appenders {
            if !self.appenders.contains_key(appender) {
                return Err(LoggerError::unknown_appender(
                    name,
                    appender,
                    self.appender_names(),
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn appender_names(&self) -> String {
        self.appenders
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
refresh_rate: 5
appenders:
  stdout:
    kind: console
    pattern: "[%L] %M"
  app:
    kind: file
    pattern: "%M"
    path: PLACEHOLDER
root:
  level: info
  appenders: [stdout]
loggers:
  main:
    level: debug
    additive: true
    multiline: true
    appenders: [app]
"#;

    fn sample(dir: &Path) -> Config {
        let path = dir.join("logs").join("app.log");
        Config::from_yaml_str(&SAMPLE.replace("PLACEHOLDER", &path.display().to_string()))
            .expect("sample parses")
    }

    #[test]
    fn test_parse_yaml() {
        let dir = tempdir().unwrap();
        let config = sample(dir.path());

        assert_eq!(config.refresh_rate, 5);
        assert_eq!(config.appenders["stdout"].kind, "console");
        assert_eq!(config.root.appenders, ["stdout"]);
        let main = &config.loggers["main"];
        assert!(main.additive && main.multiline);
        assert_eq!(main.parsed_level("main").unwrap(), Level::Debug);
    }

    #[test]
    fn test_validate_creates_log_directory() {
        let dir = tempdir().unwrap();
        let config = sample(dir.path());

        config.validate().expect("sample is valid");
        assert!(dir.path().join("logs").join("app.log").exists());
    }

    #[test]
    fn test_defaults_when_fields_missing() {
        let config = Config::from_yaml_str("root:\n  appenders: []\n").unwrap();
        assert_eq!(config.refresh_rate, 0);
        assert_eq!(config.root.parsed_level("root").unwrap(), Level::Error);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_kind() {
        let config = Config::new().with_appender(
            "sys",
            AppenderConfig {
                kind: "syslog".into(),
                ..AppenderConfig::default()
            },
        );
        let err = config.validate().unwrap_err();
        assert!(matches!(err, LoggerError::UnknownAppenderKind { .. }));
        assert!(err.to_string().contains("console|file"));
    }

    #[test]
    fn test_missing_path() {
        let config = Config::new().with_appender(
            "app",
            AppenderConfig {
                kind: "file".into(),
                pattern: "%M".into(),
                path: None,
            },
        );
        assert!(matches!(
            config.validate(),
            Err(LoggerError::MissingPath { appender }) if appender == "app"
        ));
    }

    #[test]
    fn test_unopenable_path() {
        let dir = tempdir().unwrap();
        let config = Config::new().with_appender("app", AppenderConfig::file(dir.path(), "%M"));
        assert!(matches!(config.validate(), Err(LoggerError::OpenPath { .. })));
    }

    #[test]
    fn test_unknown_level() {
        let config = Config::new().with_logger(
            "main",
            LoggerConfig {
                level: "verbose".into(),
                ..LoggerConfig::default()
            },
        );
        let err = config.validate().unwrap_err();
        assert!(matches!(err, LoggerError::UnknownLevel { .. }));
        assert!(err.to_string().contains("fine|trace|debug|info|warn|error|crit"));
    }

    #[test]
    fn test_dangling_appender_lists_alternatives() {
        let config = Config::new()
            .with_appender("stdout", AppenderConfig::console("%M"))
            .with_root(LoggerConfig::new(Level::Info).with_appender("missing"));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, LoggerError::UnknownAppender { .. }));
        assert!(err.to_string().contains("[stdout]"));
    }

    #[test]
    fn test_reserved_names() {
        for reserved in [ROOT_TARGET, DISCARD_TARGET] {
            let config = Config::new().with_logger(reserved, LoggerConfig::new(Level::Info));
            assert!(matches!(
                config.validate(),
                Err(LoggerError::ReservedLoggerName { .. })
            ));
        }
    }

    #[test]
    fn test_from_path_json_and_missing_file() {
        let dir = tempdir().unwrap();
        let json_path = dir.path().join("log.json");
        fs::write(
            &json_path,
            r#"{"refresh_rate": 1, "root": {"level": "warn", "appenders": []}}"#,
        )
        .unwrap();

        let config = Config::from_path(&json_path).unwrap();
        assert_eq!(config.refresh_rate, 1);
        assert_eq!(config.root.level, "warn");

        let err = Config::from_path(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, LoggerError::ConfigLoad { .. }));
    }
}
