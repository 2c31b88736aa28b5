//! The mock store: the explicit context every operation goes through.
//!
//! One store backs one test at a time, handed explicitly to every
//! operation rather than living as a process-wide control block. It owns
//! the arena, the header layout selected from its size, the declarator
//! interning table, and the closure tables the entry bodies index into.

use smallvec::SmallVec;
use stunt_arena::codec::{read_call_header, CALL_HEADER_SIZE};
use stunt_arena::{Arena, ArenaConfig, ConfigError, HeaderLayout};
use stunt_core::harness::{report, Harness, ValidationMode};
use stunt_core::{MockCallback, MockError, OverrideHandler};

use crate::intern::DeclaratorTable;

/// Configuration for a [`MockStore`].
#[derive(Clone, Copy, Debug, Default)]
pub struct StoreConfig {
    /// Arena sizing.
    pub arena: ArenaConfig,
    /// How failures are routed to the harness.
    pub validation: ValidationMode,
}

impl StoreConfig {
    /// Config with the given arena size and strict validation.
    pub fn with_arena_size(size: usize) -> Self {
        Self {
            arena: ArenaConfig::new(size),
            ..Self::default()
        }
    }
}

/// The mock/spy store backing one test at a time.
///
/// Reset it in the test's setup, seed it in Arrange, pop in Act, query in
/// Assert, and validate consumption in teardown. All record state lives in
/// the arena; the store adds the interning table and the closure tables
/// that entry bodies reference by index.
pub struct MockStore {
    pub(crate) arena: Arena,
    pub(crate) layout: HeaderLayout,
    pub(crate) names: DeclaratorTable,
    pub(crate) callbacks: Vec<MockCallback>,
    pub(crate) handlers: Vec<OverrideHandler>,
    pub(crate) validation: ValidationMode,
}

impl MockStore {
    /// Create a store from a validated configuration.
    pub fn new(config: StoreConfig) -> Result<Self, ConfigError> {
        let arena = Arena::new(&config.arena)?;
        let layout = HeaderLayout::for_size(arena.size());
        Ok(Self {
            arena,
            layout,
            names: DeclaratorTable::default(),
            callbacks: Vec::new(),
            handlers: Vec::new(),
            validation: config.validation,
        })
    }

    /// Return the store to its initial state.
    ///
    /// Idempotent. Required between tests; every previously returned handle,
    /// payload slice, and declarator id is invalidated.
    pub fn reset(&mut self) {
        self.arena.reset();
        self.names.clear();
        self.callbacks.clear();
        self.handlers.clear();
    }

    /// Validate on test completion that every seeded mock was consumed.
    ///
    /// Fails naming the declarator of the first unconsumed entry in arena
    /// order. Override entries are exempt (they are never "consumed");
    /// infinite entries are not exempt, used or not. A [`MockStore::reset`]
    /// is still required before the store is reused.
    pub fn tear_down(&self) -> Result<(), MockError> {
        match self.find_any_unconsumed() {
            Some(handle) => Err(MockError::UnconsumedAtTeardown {
                declarator: handle.declarator(),
            }),
            None => Ok(()),
        }
    }

    /// Require pops to consume entries in exact arena (creation) order.
    pub fn enforce_call_order_tracking(&mut self) {
        self.arena.set_order_tracking(true);
    }

    /// Stop requiring strict consumption order.
    pub fn cease_call_order_tracking(&mut self) {
        self.arena.set_order_tracking(false);
    }

    /// Bytes left between the two arena watermarks.
    pub fn free_space(&self) -> usize {
        self.arena.free_space()
    }

    /// Global call count across all declarators (0 before the first call).
    pub fn total_calls(&self) -> u32 {
        self.arena.total_calls()
    }

    /// The configured failure routing mode.
    pub fn validation(&self) -> ValidationMode {
        self.validation
    }

    /// The header layout selected from the arena size.
    pub fn layout(&self) -> HeaderLayout {
        self.layout
    }

    /// Route an error into the harness according to the validation mode.
    pub fn report_failure<H: Harness>(&self, harness: &mut H, error: &MockError) {
        report(harness, self.validation, error);
    }

    /// Collect the extended call-data chain of an entry, oldest first.
    ///
    /// `newest` is the byte offset the entry header points at. The chain is
    /// short in any realistic test, so the collection stays on the stack.
    pub(crate) fn chain_blocks(&self, newest: usize) -> SmallVec<[usize; 8]> {
        let mut blocks: SmallVec<[usize; 8]> = SmallVec::new();
        let mut offset = Some(newest);
        while let Some(block) = offset {
            blocks.push(block);
            offset = read_call_header(&self.arena, block).prev();
        }
        blocks.reverse();
        blocks
    }

    /// Spy capacity of an extended entry: the size its first consumption
    /// recorded.
    pub(crate) fn chain_capacity(&self, newest: usize) -> usize {
        let mut offset = newest;
        loop {
            let header = read_call_header(&self.arena, offset);
            match header.prev() {
                Some(prev) => offset = prev,
                None => return header.size as usize,
            }
        }
    }

    /// Borrow the spy bytes of an extended call-data block, if it has any.
    pub(crate) fn block_spy(&self, block: usize) -> Option<&[u8]> {
        let header = read_call_header(&self.arena, block);
        header
            .has_spy_data
            .then(|| self.arena.bytes(block + CALL_HEADER_SIZE, header.size as usize))
    }
}
