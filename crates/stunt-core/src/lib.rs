//! Core types and contracts for the stunt test-double engine.
//!
//! This is the leaf crate with zero internal stunt dependencies. It defines
//! the abstractions shared by the arena and the engine: declarator
//! identifiers, the error model, the outbound harness contract, and the
//! callback/handler contracts.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod callback;
pub mod error;
pub mod harness;
pub mod id;

// Re-export core types at crate root for convenience.
pub use callback::{MockCallback, OverrideHandler};
pub use error::MockError;
pub use harness::{report, Harness, ValidationMode};
pub use id::DeclaratorId;
