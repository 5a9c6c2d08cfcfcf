//! Tracing/logging setup shared by every binary and test harness that embeds
//! the catalog engine.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize process-wide logging with JSON output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    crate::tracing::init_with(LogFormat::Json);
}

/// Initialize process-wide logging with an explicit output format.
pub fn init_with(format: LogFormat) {
    crate::tracing::init_with(format);
}
