//! Tracing and logging setup shared by every binary and test harness.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{LogFormat, ObservabilityError};

/// Initialize process-wide tracing from the environment.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    let _ = self::tracing::try_init();
}

/// Like [`init`], but reports when a global subscriber is already installed.
pub fn try_init() -> Result<(), ObservabilityError> {
    self::tracing::try_init()
}
