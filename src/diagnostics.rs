//! Diagnostic sink (`§7`, `SPEC_FULL §7a`).
//!
//! Grounded on the teacher's `vdbe::trace` tracing callback: rather than
//! hard-coding `eprintln!` at the call site, compilation errors are routed
//! through a small pluggable [`Sink`] trait. The default mirrors what the
//! rest of the teacher codebase actually does on unrecoverable errors
//! (`eprintln!`), so a caller who doesn't configure anything sees the same
//! behavior a caller of the original would.

/// Receives one diagnostic message per call. Messages are already
/// formatted with the `error: <expr>: <message>` prefix from `§7`.
pub trait Sink {
    fn error(&self, message: &str);
}

/// Default sink: write to stderr, matching the teacher's own fallback
/// behavior in `tcl_ext.rs` and `vdbe/engine.rs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl Sink for StderrSink {
    fn error(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// A sink that discards everything. Useful in tests that assert on the
/// returned `Error` and don't want diagnostic noise.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {
    fn error(&self, _message: &str) {}
}

/// Format the `§7` diagnostic line: `error: <expr>: <message>`.
pub fn format_error(expr: &str, message: &str) -> String {
    format!("error: {expr}: {message}")
}
