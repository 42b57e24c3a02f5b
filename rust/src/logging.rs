//! Logging macros for the scheduling algorithms with verbosity level control.
//!
//! Messages are forwarded to the `log` facade so the embedding application
//! picks the sink. The verbosity gate is checked before any formatting.
//! Verbosity levels:
//! - 0: SILENT (errors are returned, never logged)
//! - 1: CHANGES (final start times, chosen initiation interval)
//! - 2: CHECKS (phase outcomes, resource-conflict delays)
//! - 3: DEBUG (individual simplex pivots)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: committed schedules, initiation interval decisions.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            log::info!($($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: simplex phase results, operations delayed by a resource conflict.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            log::debug!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: pivot-by-pivot solver traces.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            log::trace!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels_are_ordered() {
        assert!(VERBOSITY_SILENT < VERBOSITY_CHANGES);
        assert!(VERBOSITY_CHANGES < VERBOSITY_CHECKS);
        assert!(VERBOSITY_CHECKS < VERBOSITY_DEBUG);
    }

    #[test]
    fn test_log_macros_compile() {
        // No logger installed; this only checks the macros expand and run
        let verbosity = VERBOSITY_DEBUG;
        log_changes!(verbosity, "test {}", 1);
        log_checks!(verbosity, "test {}", 2);
        log_debug!(verbosity, "test {}", 3);
    }
}
