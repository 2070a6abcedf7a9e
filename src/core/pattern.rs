//! Pattern formatting for log lines
//!
//! A pattern is plain text with `%` escapes:
//!
//! | Code        | Output                                         |
//! |-------------|------------------------------------------------|
//! | `%T`        | long time, `15:04:05.000 ZONE`                 |
//! | `%t`        | short time, `15:04`                            |
//! | `%D`        | long date, `2006-01-02`                        |
//! | `%d`        | short date, `02-01-06`                         |
//! | `%D{fmt}`   | custom strftime layout (first two only)        |
//! | `%L`        | level                                          |
//! | `%S`        | source, `file:line@function`                   |
//! | `%s`        | last path segment of the source                |
//! | `%M`        | message                                        |
//! | `%C`        | target name                                    |
//! | `%U`        | render times in UTC; following spaces dropped  |
//!
//! Unknown codes are dropped together with their `%`. Every line ends with
//! a newline.

use super::record::RecordData;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use std::borrow::Cow;
use std::fmt::{self, Write as _};

/// `[%D %T] [%L] (%S) %M`
pub const FORMAT_DEFAULT: &str = "[%D %T] [%L] (%S) %M";
/// `[%t %d] [%L] %M`
pub const FORMAT_SHORT: &str = "[%t %d] [%L] %M";
/// `[%L] %M`
pub const FORMAT_ABBREV: &str = "[%L] %M";
/// Marker switching an appender to UTC timestamps
pub const FORMAT_TIME_UTC: &str = "%U";

const CUSTOM_LAYOUT_OPEN: &str = "%D{";
const MAX_CUSTOM_LAYOUTS: usize = 2;

/// Whether a pattern asks for UTC timestamps.
pub fn is_utc(pattern: &str) -> bool {
    pattern.contains(FORMAT_TIME_UTC)
}

/// Date and time strings for the most recently formatted second.
///
/// Records arriving within the same second reuse these strings. The
/// millisecond part of `%T` therefore belongs to the first record of the
/// second.
#[derive(Debug, Clone, Default)]
pub struct FormatCache {
    last_second: Option<i64>,
    short_time: String,
    short_date: String,
    long_time: String,
    long_date: String,
}

impl FormatCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Epoch second the cached strings were rendered for
    pub fn last_second(&self) -> Option<i64> {
        self.last_second
    }

    pub fn short_time(&self) -> &str {
        &self.short_time
    }

    pub fn short_date(&self) -> &str {
        &self.short_date
    }

    pub fn long_time(&self) -> &str {
        &self.long_time
    }

    pub fn long_date(&self) -> &str {
        &self.long_date
    }

    fn refresh<Tz>(&mut self, at: &DateTime<Tz>)
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let second = at.timestamp();
        if self.last_second == Some(second) {
            return;
        }
        self.last_second = Some(second);

        self.short_time.clear();
        let _ = write!(self.short_time, "{}", at.format("%H:%M"));
        self.short_date.clear();
        let _ = write!(self.short_date, "{}", at.format("%d-%m-%y"));
        self.long_time.clear();
        let _ = write!(self.long_time, "{}", at.format("%H:%M:%S%.3f %Z"));
        self.long_date.clear();
        let _ = write!(self.long_date, "{}", at.format("%Y-%m-%d"));
    }
}

/// Render one record.
///
/// # Examples
///
/// ```
/// use hotswap_logger::core::pattern::{format, FormatCache};
/// use hotswap_logger::core::record::{Event, RecordPool, SourceLocation};
/// use hotswap_logger::Level;
///
/// let pool = RecordPool::new();
/// let rec = pool.acquire(Event {
///     target: "root",
///     level: Level::Info,
///     source: SourceLocation::caller(),
///     args: format_args!("hi"),
///     multiline: false,
/// });
///
/// let mut cache = FormatCache::new();
/// assert_eq!(format("[%L] %M", false, &rec, &mut cache), "[INFO] hi\n");
/// ```
pub fn format(pattern: &str, is_utc: bool, record: &RecordData, cache: &mut FormatCache) -> String {
    let mut out = String::with_capacity(pattern.len() + record.message().len() + 32);
    format_into(&mut out, pattern, is_utc, record, cache);
    out
}

/// Render one record, appending to `out`. An empty pattern renders nothing.
pub fn format_into(
    out: &mut String,
    pattern: &str,
    is_utc: bool,
    record: &RecordData,
    cache: &mut FormatCache,
) {
    if pattern.is_empty() {
        return;
    }

    if is_utc {
        cache.refresh(record.created_utc());
    } else {
        cache.refresh(record.created());
    }

    let expanded = expand_custom_layouts(pattern, is_utc, record);
    let mut pieces = expanded.split('%');
    if let Some(first) = pieces.next() {
        out.push_str(first);
    }

    for piece in pieces {
        let mut chars = piece.chars();
        let Some(code) = chars.next() else {
            continue;
        };
        let rest = chars.as_str();

        match code {
            'T' => out.push_str(&cache.long_time),
            't' => out.push_str(&cache.short_time),
            'D' => out.push_str(&cache.long_date),
            'd' => out.push_str(&cache.short_date),
            'L' => out.push_str(record.level().to_str()),
            'S' => out.push_str(record.source()),
            's' => out.push_str(record.source().rsplit('/').next().unwrap_or_default()),
            'M' => out.push_str(record.message()),
            'C' => out.push_str(record.target()),
            'U' => {
                out.push_str(rest.trim_start_matches(' '));
                continue;
            }
            _ => {}
        }
        out.push_str(rest);
    }

    out.push('\n');
}

/// Substitute the first two `%D{layout}` escapes with the record's time.
fn expand_custom_layouts<'p>(pattern: &'p str, is_utc: bool, record: &RecordData) -> Cow<'p, str> {
    if !pattern.contains(CUSTOM_LAYOUT_OPEN) {
        return Cow::Borrowed(pattern);
    }

    let mut out = String::with_capacity(pattern.len() + 16);
    let mut rest = pattern;
    let mut seen = 0;

    while let Some(start) = rest.find(CUSTOM_LAYOUT_OPEN) {
        let body = &rest[start + CUSTOM_LAYOUT_OPEN.len()..];
        let Some(end) = body.find('}') else {
            break;
        };
        let escape_len = CUSTOM_LAYOUT_OPEN.len() + end + 1;

        out.push_str(&rest[..start]);
        let rendered = seen < MAX_CUSTOM_LAYOUTS && render_layout(&mut out, &body[..end], is_utc, record);
        if seen < MAX_CUSTOM_LAYOUTS {
            seen += 1;
        }
        if !rendered {
            out.push_str(&rest[start..start + escape_len]);
        }
        rest = &rest[start + escape_len..];
    }

    out.push_str(rest);
    Cow::Owned(out)
}

/// Returns false, writing nothing, when chrono cannot parse the layout.
fn render_layout(out: &mut String, layout: &str, is_utc: bool, record: &RecordData) -> bool {
    let items: Vec<Item<'_>> = StrftimeItems::new(layout).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return false;
    }

    let mut rendered = String::new();
    let written = if is_utc {
        write!(rendered, "{}", record.created_utc().format_with_items(items.iter()))
    } else {
        write!(rendered, "{}", record.created().format_with_items(items.iter()))
    };
    if written.is_err() {
        return false;
    }
    out.push_str(&rendered);
    true
}
