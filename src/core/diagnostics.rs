//! Internal diagnostics written to stderr
//!
//! The engine cannot report its own failures through itself, so sink errors,
//! reload failures and record lifecycle violations go to stderr instead.

use std::fmt;

pub(crate) fn error(args: fmt::Arguments<'_>) {
    eprintln!("[LOGGER ERROR] {}", args);
}

pub(crate) fn warning(args: fmt::Arguments<'_>) {
    eprintln!("[LOGGER WARNING] {}", args);
}

/// Invariant breaches that indicate a bug but must not take the host down.
pub(crate) fn critical(args: fmt::Arguments<'_>) {
    eprintln!("[LOGGER CRITICAL] {}", args);
}

#[cfg(feature = "diagnostics")]
pub(crate) fn debug(args: fmt::Arguments<'_>) {
    eprintln!("[LOGGER DEBUG] {}", args);
}

#[cfg(not(feature = "diagnostics"))]
#[inline(always)]
pub(crate) fn debug(_args: fmt::Arguments<'_>) {}
