//! The outbound test-harness contract.
//!
//! The engine never aborts or reports on its own; every failure is routed to
//! a [`Harness`] through exactly two signals, `fail` and `ignore`. Nothing
//! else is assumed about the harness, which keeps the engine usable under
//! any assertion framework.

use crate::error::MockError;

/// How failures are routed to the harness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Failures are failures.
    #[default]
    Strict,
    /// Failures downgrade to skip/ignore signals; semantics are otherwise
    /// identical.
    Permissive,
}

/// Receiver for the engine's two outbound signals.
pub trait Harness {
    /// The current test failed with the given message.
    fn fail(&mut self, message: &str);

    /// The current test should be skipped/ignored with the given message.
    fn ignore(&mut self, message: &str);
}

/// Route an error into the harness according to the validation mode.
pub fn report<H: Harness>(harness: &mut H, mode: ValidationMode, error: &MockError) {
    let message = error.to_string();
    match mode {
        ValidationMode::Strict => harness.fail(&message),
        ValidationMode::Permissive => harness.ignore(&message),
    }
}
