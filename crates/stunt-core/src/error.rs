//! Error types for the stunt test-double engine.
//!
//! Every failure the engine can produce carries the declarator it was
//! serving, so the message handed to the harness names the call site the
//! test author recognises.

use std::error::Error;
use std::fmt;

/// Message tag prepended to every harness-bound failure message.
pub const MESSAGE_TAG: &str = "stunt-mock";

/// Errors raised by the mock store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockError {
    /// An arena watermark would cross the other one.
    OutOfSpace {
        /// Declarator being served when space ran out.
        declarator: &'static str,
        /// Number of bytes requested (alignment-rounded).
        requested: usize,
        /// Bytes left between the two watermarks.
        free: usize,
    },
    /// An internal offset lost its alignment (sanity breach).
    Unaligned {
        /// Declarator being served when the breach was detected.
        declarator: &'static str,
    },
    /// A pop was requested but no unconsumed mock remains.
    NoMoreMocks {
        /// Declarator the pop was issued for.
        declarator: &'static str,
    },
    /// A pop skipped past an unconsumed earlier entry while call-order
    /// tracking was enforced.
    OutOfOrder {
        /// Declarator the out-of-order pop was issued for.
        declarator: &'static str,
    },
    /// A query indexed past the existing entries for a declarator.
    NotFound {
        /// Declarator the query named.
        declarator: &'static str,
        /// The creation index that had no entry behind it.
        index: u32,
    },
    /// A reusable/infinite mock was popped with more spy bytes than its
    /// first consumption recorded.
    SpySizeInconsistent {
        /// Declarator of the offending entry.
        declarator: &'static str,
        /// Spy capacity fixed by the first consumption.
        capacity: usize,
        /// Size of the rejected spy payload.
        requested: usize,
    },
    /// At least one mock was still unconsumed when the test tore down.
    UnconsumedAtTeardown {
        /// Declarator of the first unconsumed entry in arena order.
        declarator: &'static str,
    },
}

impl MockError {
    /// The declarator this error was raised for.
    pub fn declarator(&self) -> &'static str {
        match self {
            Self::OutOfSpace { declarator, .. }
            | Self::Unaligned { declarator }
            | Self::NoMoreMocks { declarator }
            | Self::OutOfOrder { declarator }
            | Self::NotFound { declarator, .. }
            | Self::SpySizeInconsistent { declarator, .. }
            | Self::UnconsumedAtTeardown { declarator } => declarator,
        }
    }
}

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfSpace {
                declarator,
                requested,
                free,
            } => write!(
                f,
                "{MESSAGE_TAG}: not enough space ({requested} bytes requested, {free} free) for {declarator}"
            ),
            Self::Unaligned { declarator } => {
                write!(f, "{MESSAGE_TAG}: entry size got unaligned for {declarator}")
            }
            Self::NoMoreMocks { declarator } => {
                write!(f, "{MESSAGE_TAG}: no more mocks to pop for {declarator}")
            }
            Self::OutOfOrder { declarator } => {
                write!(f, "{MESSAGE_TAG}: mock popped out of order for {declarator}")
            }
            Self::NotFound { declarator, index } => write!(
                f,
                "{MESSAGE_TAG}: no mock/spy entry at creation index {index} for {declarator}"
            ),
            Self::SpySizeInconsistent {
                declarator,
                capacity,
                requested,
            } => write!(
                f,
                "{MESSAGE_TAG}: inconsistent spy-data size ({requested} bytes, capacity {capacity}) for {declarator}"
            ),
            Self::UnconsumedAtTeardown { declarator } => write!(
                f,
                "{MESSAGE_TAG}: detected unconsumed mock object for {declarator}"
            ),
        }
    }
}

impl Error for MockError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_declarator() {
        let errors = [
            MockError::OutOfSpace {
                declarator: "read_register",
                requested: 16,
                free: 4,
            },
            MockError::Unaligned {
                declarator: "read_register",
            },
            MockError::NoMoreMocks {
                declarator: "read_register",
            },
            MockError::OutOfOrder {
                declarator: "read_register",
            },
            MockError::NotFound {
                declarator: "read_register",
                index: 3,
            },
            MockError::SpySizeInconsistent {
                declarator: "read_register",
                capacity: 4,
                requested: 8,
            },
            MockError::UnconsumedAtTeardown {
                declarator: "read_register",
            },
        ];
        for error in errors {
            let message = error.to_string();
            assert!(message.starts_with(MESSAGE_TAG), "{message}");
            assert!(message.ends_with("read_register"), "{message}");
            assert_eq!(error.declarator(), "read_register");
        }
    }
}
