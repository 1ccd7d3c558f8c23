#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Log output for dbmatrix runs.
//!
//! Every line carries the id of the fixture whose case is executing, when there is one.

use std::sync::atomic::{AtomicUsize, Ordering};

pub use log;
use thiserror::Error;

mod fixture;

pub use fixture::{current_fixture, scoped, with_fixture};

#[cfg(debug_assertions)]
pub const DEFAULT_LOG_LEVEL: &str = "dbmatrix=trace";
#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_LEVEL: &str = "dbmatrix=info";

#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    SetLogger(#[from] log::SetLoggerError),
}

/// Filter directives from `DBMATRIX_LOG`, then `RUST_LOG`, then [`DEFAULT_LOG_LEVEL`].
#[must_use]
pub fn log_filter() -> String {
    std::env::var("DBMATRIX_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
}

/// Installs the global logger.
///
/// # Errors
///
/// * If a global logger was already installed
pub fn init() -> Result<(), InitError> {
    static MAX_TARGET_PREFIX_LEN: AtomicUsize = AtomicUsize::new(0);
    static MAX_LEVEL_PREFIX_LEN: AtomicUsize = AtomicUsize::new(0);

    pretty_env_logger::formatted_builder()
        .parse_filters(&log_filter())
        .format(|buf, record| {
            use std::io::Write as _;

            use pretty_env_logger::env_logger::fmt::Color;

            let target = record.target();
            let level = record.level();

            let mut style = buf.style();
            let level_style = style.set_color(match level {
                log::Level::Error => Color::Red,
                log::Level::Warn => Color::Yellow,
                log::Level::Info => Color::Green,
                log::Level::Debug => Color::Blue,
                log::Level::Trace => Color::Magenta,
            });

            let ts = buf.timestamp_millis();
            let level_padding = padding(&MAX_LEVEL_PREFIX_LEN, level.as_str().len());
            let target_padding = padding(&MAX_TARGET_PREFIX_LEN, target.len());

            write!(
                buf,
                "\
                [{ts}] \
                [{target}] {empty:<target_padding$}\
                [{level}] {empty:<level_padding$}\
                ",
                empty = "",
                level = level_style.value(level),
            )?;

            if let Some(fixture) = current_fixture() {
                let mut style = buf.style();
                let fixture_style = style.set_color(Color::Cyan);
                write!(buf, "[{}] ", fixture_style.value(fixture))?;
            }

            writeln!(buf, "{}", record.args())
        })
        .try_init()?;

    Ok(())
}

/// Padding that aligns a prefix of `len` with the longest one seen so far.
fn padding(max: &AtomicUsize, len: usize) -> usize {
    let longest = max.fetch_max(len, Ordering::SeqCst).max(len);
    longest - len
}

/// Logs the first form at debug level, or the second, more detailed one when trace
/// is enabled.
#[cfg(feature = "macros")]
#[macro_export]
macro_rules! debug_or_trace {
    (($($debug:tt)+), ($($trace:tt)+)) => {
        if $crate::log::log_enabled!($crate::log::Level::Trace) {
            $crate::log::trace!($($trace)*);
        } else {
            $crate::log::debug!($($debug)*);
        }
    }
}
