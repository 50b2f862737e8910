//! Logger setup plus logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! A module opts in by declaring the flag and importing the macros from the
//! crate root:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_info, log_warn};
//!
//! log_info!("Parsed {} records", count);
//! ```

use log::LevelFilter;

/// Env var that lowers the default level to debug when set to `1` or `true`.
pub const DEBUG_ENV: &str = "TRAVEL_MAP_DEBUG";

fn debug_requested(value: Option<&str>) -> bool {
    value
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn default_level() -> LevelFilter {
    if debug_requested(std::env::var(DEBUG_ENV).ok().as_deref()) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Starts `env_logger`. `RUST_LOG` still wins over the default level. Safe to
/// call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(default_level())
        .parse_default_env()
        .try_init();
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_values() {
        assert!(debug_requested(Some("1")));
        assert!(debug_requested(Some("TRUE")));
        assert!(!debug_requested(Some("0")));
        assert!(!debug_requested(None));
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logging();
        init_logging();
    }
}
