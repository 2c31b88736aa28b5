//! Benchmark profiles for the stunt test-double engine.
//!
//! Provides pre-built store configurations so benches exercise both header
//! layouts with realistic arena sizes.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use stunt_engine::{MockStore, StoreConfig};

/// Narrow-layout store: 4 KiB arena, 11-bit offsets, 8-bit call orders.
pub fn narrow_store() -> MockStore {
    MockStore::new(StoreConfig::with_arena_size(4 * 1024)).expect("4 KiB is a valid arena size")
}

/// Wide-layout store: 64 KiB arena, 15-bit offsets, 32-bit call orders.
pub fn wide_store() -> MockStore {
    MockStore::new(StoreConfig::with_arena_size(64 * 1024)).expect("64 KiB is a valid arena size")
}
