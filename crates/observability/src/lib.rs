//! Process-wide tracing setup shared by binaries and tests.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::{LOG_FORMAT_ENV, LogFormat};

/// Initialize process-wide observability using the format from the environment.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init_with_format(LogFormat::from_env());
}

/// Initialize a subscriber that writes through the test harness capture.
pub fn init_for_tests() {
    tracing::init_for_tests();
}
