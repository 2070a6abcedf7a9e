//! Logging macros for ergonomic log message formatting.
//!
//! Every macro records `file!()`, `line!()` and `module_path!()` of the call
//! site and accepts three forms:
//!
//! - `info!("fmt", args..)` logs to the `root` target of the global registry
//! - `info!(target: "net", "fmt", args..)` logs to a named target of the
//!   global registry
//! - `info!(handle, "fmt", args..)` logs through a [`Target`](crate::Target)
//!   handle already resolved by the caller
//!
//! Arguments are only formatted when the target accepts the level.
//!
//! # Examples
//!
//! ```
//! use hotswap_logger::{info, target, warn};
//!
//! // Basic logging
//! info!("Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!("Server listening on port {}", port);
//!
//! // Named target
//! warn!(target: "net", "retrying {} after {}ms", "db", 250);
//!
//! // Resolved handle
//! let net = target("net");
//! info!(net, "accepted {} connections", 3);
//! ```

/// Log a message at an explicit level.
///
/// # Examples
///
/// ```
/// use hotswap_logger::{log, Level};
/// log!(Level::Info, "Simple message");
/// log!(target: "http", Level::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    (target: $target:expr, $level:expr, $($arg:tt)+) => {
        $crate::Registry::global().log_at(
            $target,
            $level,
            $crate::SourceLocation::new(file!(), line!(), module_path!()),
            format_args!($($arg)+),
        )
    };
    ($level:expr, $fmt:literal $($arg:tt)*) => {
        $crate::Registry::global().log_at(
            $crate::ROOT_TARGET,
            $level,
            $crate::SourceLocation::new(file!(), line!(), module_path!()),
            format_args!($fmt $($arg)*),
        )
    };
    ($handle:expr, $level:expr, $($arg:tt)+) => {
        $handle.log_at(
            $level,
            $crate::SourceLocation::new(file!(), line!(), module_path!()),
            format_args!($($arg)+),
        )
    };
}

/// Log a fine-level message.
#[macro_export]
macro_rules! fine {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::log!(target: $target, $crate::Level::Fine, $($arg)+)
    };
    ($fmt:literal $($arg:tt)*) => {
        $crate::log!($crate::Level::Fine, $fmt $($arg)*)
    };
    ($handle:expr, $($arg:tt)+) => {
        $crate::log!($handle, $crate::Level::Fine, $($arg)+)
    };
}

/// Log a trace-level message.
///
/// # Examples
///
/// ```
/// use hotswap_logger::trace;
/// trace!("Entering function: calculate()");
/// trace!(target: "math", "Variable value: {}", 42);
/// ```
#[macro_export]
macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::log!(target: $target, $crate::Level::Trace, $($arg)+)
    };
    ($fmt:literal $($arg:tt)*) => {
        $crate::log!($crate::Level::Trace, $fmt $($arg)*)
    };
    ($handle:expr, $($arg:tt)+) => {
        $crate::log!($handle, $crate::Level::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::log!(target: $target, $crate::Level::Debug, $($arg)+)
    };
    ($fmt:literal $($arg:tt)*) => {
        $crate::log!($crate::Level::Debug, $fmt $($arg)*)
    };
    ($handle:expr, $($arg:tt)+) => {
        $crate::log!($handle, $crate::Level::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::log!(target: $target, $crate::Level::Info, $($arg)+)
    };
    ($fmt:literal $($arg:tt)*) => {
        $crate::log!($crate::Level::Info, $fmt $($arg)*)
    };
    ($handle:expr, $($arg:tt)+) => {
        $crate::log!($handle, $crate::Level::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::log!(target: $target, $crate::Level::Warning, $($arg)+)
    };
    ($fmt:literal $($arg:tt)*) => {
        $crate::log!($crate::Level::Warning, $fmt $($arg)*)
    };
    ($handle:expr, $($arg:tt)+) => {
        $crate::log!($handle, $crate::Level::Warning, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// use hotswap_logger::error;
/// error!("Failed to connect to database");
/// error!(target: "db", "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::log!(target: $target, $crate::Level::Error, $($arg)+)
    };
    ($fmt:literal $($arg:tt)*) => {
        $crate::log!($crate::Level::Error, $fmt $($arg)*)
    };
    ($handle:expr, $($arg:tt)+) => {
        $crate::log!($handle, $crate::Level::Error, $($arg)+)
    };
}

/// Log a critical-level message.
#[macro_export]
macro_rules! critical {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::log!(target: $target, $crate::Level::Critical, $($arg)+)
    };
    ($fmt:literal $($arg:tt)*) => {
        $crate::log!($crate::Level::Critical, $fmt $($arg)*)
    };
    ($handle:expr, $($arg:tt)+) => {
        $crate::log!($handle, $crate::Level::Critical, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::appender::tests::memory_appender;
    use crate::core::target::Target;
    use crate::Level;
    use std::sync::Arc;

    #[test]
    fn test_handle_form_formats_arguments() {
        let (appender, buffer) = memory_appender("macro", "%L %M");
        let appender = Arc::new(appender);
        let target = Target::builder("macro")
            .level(Level::Debug)
            .appender(Arc::clone(&appender))
            .build();

        let user_id = 42;
        debug!(target, "user {} logged in", user_id);
        info!(&target, "plain");
        log!(target, Level::Warning, "{}-{}", "a", 1);
        trace!(target, "filtered {}", user_id);
        appender.close(true);

        assert_eq!(buffer.lines(), ["DEBUG user 42 logged in", "INFO plain", "WARN a-1"]);
    }

    #[test]
    fn test_source_names_module() {
        let (appender, buffer) = memory_appender("src", "%S");
        let appender = Arc::new(appender);
        let target = Target::builder("src")
            .level(Level::Fine)
            .appender(Arc::clone(&appender))
            .build();

        fine!(target, "where");
        appender.close(true);

        let source = buffer.contents();
        assert!(source.starts_with("src/macros.rs:"), "{}", source);
        assert!(source.trim_end().ends_with("@tests"), "{}", source);
    }

    #[test]
    fn test_global_forms_compile_and_do_not_panic() {
        critical!("unconfigured {}", 1);
        error!(target: "nowhere", "unconfigured");
        warn!("plain");
    }
}
