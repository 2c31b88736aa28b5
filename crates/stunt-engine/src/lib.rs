//! Mock registry, pop/spy engine, and query surface for the stunt
//! test-double engine.
//!
//! [`MockStore`] is the explicit context every operation goes through. A
//! test's Arrange phase seeds mocks into it, the Act phase pops them in FIFO
//! order while the code under test silently records the arguments it was
//! given, and the Assert phase queries call counts, global call ordering,
//! spy bytes, and mock payloads.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod intern;
mod pop;
mod query;
mod registry;
mod store;

pub use query::MockHandle;
pub use store::{MockStore, StoreConfig};
