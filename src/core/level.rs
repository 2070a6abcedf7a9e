//! Log level definitions

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    Fine = 0,
    Trace = 1,
    Debug = 2,
    Info = 3,
    Warning = 4,
    #[default]
    Error = 5,
    Critical = 6,
}

impl Level {
    /// All levels in ascending severity.
    pub const ALL: [Level; 7] = [
        Level::Fine,
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    /// Name as rendered by `%L` in formatted lines.
    pub fn to_str(&self) -> &'static str {
        match self {
            Level::Fine => "FINE",
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARN",
            Level::Error => "ERROR",
            Level::Critical => "CRIT",
        }
    }

    /// Name accepted in configuration files.
    pub fn config_name(&self) -> &'static str {
        match self {
            Level::Fine => "fine",
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warn",
            Level::Error => "error",
            Level::Critical => "crit",
        }
    }

    /// Valid configuration names joined with `|`, for error messages.
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(Level::config_name)
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for Level {
    type Err = String;

    /// Parses configuration names only (`fine`, `trace`, ..., `crit`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|level| level.config_name() == s)
            .ok_or_else(|| format!("Invalid log level: '{}', use: {}", s, Self::valid_names()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_ascending_severity() {
        for pair in Level::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(Level::Warning > Level::Info);
    }

    #[test]
    fn test_config_names_parse() {
        assert_eq!("warn".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("crit".parse::<Level>().unwrap(), Level::Critical);
        assert_eq!("fine".parse::<Level>().unwrap(), Level::Fine);
    }

    #[test]
    fn test_unknown_name_lists_alternatives() {
        let err = "WARNING".parse::<Level>().unwrap_err();
        assert!(err.contains("WARNING"));
        assert!(err.contains("fine|trace|debug|info|warn|error|crit"));
    }

    #[test]
    fn test_rendered_names() {
        let rendered: Vec<_> = Level::ALL.iter().map(Level::to_str).collect();
        assert_eq!(rendered, ["FINE", "TRACE", "DEBUG", "INFO", "WARN", "ERROR", "CRIT"]);
    }
}
