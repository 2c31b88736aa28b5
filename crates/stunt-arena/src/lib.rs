//! Dual-ended arena storage and record codec for the stunt test-double
//! engine.
//!
//! One fixed-size byte buffer holds every piece of mock-engine state for a
//! test: pre-seeded mock entries grow from the low end, per-call observation
//! blocks grow from the high end, and both meet in the middle. All linkage
//! between records is done through alignment-unit offsets packed into
//! single-word headers; this crate owns the buffer discipline and the
//! bit-level record layouts.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod codec;
pub mod config;
pub mod layout;

pub use buffer::{align_up, Arena, ALIGN};
pub use codec::{CallHeader, Entries, EntryHeader, EntryKind, ExtendedKind, ExtendedMeta};
pub use config::{ArenaConfig, ConfigError};
pub use layout::HeaderLayout;
