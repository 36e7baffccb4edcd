//! Host capability object
//!
//! The embedding environment reports results to its test runner through
//! this interface. When no environment is attached, `NoopInternals` stands
//! in so test pages can still run to completion.

/// Capabilities the embedding host supplies to a test page.
pub trait Internals: Send + Sync {
    /// Report the final captured text to the host runner.
    fn signal_test_is_done(&self, output: &str);

    /// Report a fake navigation location without actually navigating.
    fn spoof_current_url(&self, url: &str);
}

/// No-op stand-in used when the embedding environment supplies nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInternals;

impl Internals for NoopInternals {
    fn signal_test_is_done(&self, _output: &str) {}

    fn spoof_current_url(&self, _url: &str) {}
}
