//! Stunt: a lightweight arena-backed mock/spy engine for testing code
//! written against C-style function interfaces.
//!
//! This is the top-level facade crate re-exporting the public API from the
//! stunt sub-crates. For most users, adding `stunt` as a single dev
//! dependency is sufficient.
//!
//! All state lives in one fixed-size arena: mocks seeded in the Arrange
//! phase grow from its low end, observations recorded in the Act phase grow
//! from its high end, and the Assert phase walks both read-only.
//!
//! # Quick start
//!
//! ```rust
//! use stunt::{MockStore, StoreConfig};
//!
//! let mut store = MockStore::new(StoreConfig::default()).unwrap();
//!
//! // Arrange: queue two return values for `read_sensor`.
//! store.add_u32("read_sensor", 21, None).unwrap();
//! store.add_u32("read_sensor", 42, None).unwrap();
//!
//! // Act: the test double pops them in FIFO order, recording what the
//! // code under test passed in.
//! let first = store.pop_with_u32_spy("read_sensor", 7).unwrap().unwrap();
//! assert_eq!(first.as_ref(), 21u32.to_le_bytes());
//! let second = store.pop("read_sensor", None).unwrap().unwrap();
//! assert_eq!(second.as_ref(), 42u32.to_le_bytes());
//!
//! // Assert: query counts, ordering, and observed arguments.
//! assert_eq!(store.count_calls("read_sensor"), 2);
//! assert_eq!(store.call_order("read_sensor", 0).unwrap(), 1);
//! assert_eq!(
//!     store.spy_data("read_sensor", 0).unwrap(),
//!     Some(&7u32.to_le_bytes()[..])
//! );
//!
//! // Teardown: every seeded mock must have been consumed.
//! store.tear_down().unwrap();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`arena`] | `stunt-arena` | Arena buffer, header layouts, record codec |
//! | [`types`] | `stunt-core` | Ids, errors, harness and callback contracts |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub use stunt_core::{
    report, Harness, MockCallback, MockError, OverrideHandler, ValidationMode,
};
pub use stunt_engine::{MockHandle, MockStore, StoreConfig};

/// Arena storage and record codec (re-export of `stunt-arena`).
pub mod arena {
    pub use stunt_arena::*;
}

/// Core types and contracts (re-export of `stunt-core`).
pub mod types {
    pub use stunt_core::*;
}
