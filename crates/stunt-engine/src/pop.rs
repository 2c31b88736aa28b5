//! The Act-phase engine: popping mocks and recording observations.
//!
//! A pop finds the next unconsumed entry for the declarator by linear scan
//! from offset 0, dispatches on the entry variant, allocates or chains a
//! call-data block from the arena's high end, fires the entry's callback,
//! and returns the stored payload. "Unconsumed" is `call_order == 0`, which
//! makes override entries (whose order is never set) eligible forever and
//! fully-consumed reusable entries (stamped with the sentinel) ineligible.

use std::borrow::Cow;

use stunt_arena::codec::{
    self, classify, read_entry, read_extended_meta, write_call_header, write_entry,
    write_extended_meta, CallHeader, Entries, EntryHeader, EntryKind, CALL_HEADER_SIZE,
};
use stunt_arena::ALIGN;
use stunt_core::MockError;

use crate::store::MockStore;

impl MockStore {
    /// Pop the next mock seeded for `declarator`, in FIFO order, recording
    /// `spy` as this call's observation.
    ///
    /// Returns the stored payload (`None` for empty mocks), or the bytes
    /// produced by the override handler if one is installed. An empty spy
    /// slice records nothing, like passing `None`.
    pub fn pop(
        &mut self,
        declarator: &'static str,
        spy: Option<&[u8]>,
    ) -> Result<Option<Cow<'_, [u8]>>, MockError> {
        let spy = spy.filter(|bytes| !bytes.is_empty());
        let offset = self.next_unconsumed(declarator)?;
        let header = read_entry(&self.arena, self.layout, offset);
        match classify(&self.arena, self.layout, offset, &header) {
            EntryKind::Override => Ok(self.invoke_override(offset, &header, spy)?.map(Cow::Owned)),
            kind @ (EntryKind::Reusable | EntryKind::Infinite) => {
                self.pop_extended(offset, header, kind, spy)
            }
            EntryKind::Primitive => self.pop_primitive(offset, spy),
            // Pure spies are consumed at creation and never match the scan.
            EntryKind::PureSpy => Err(MockError::NoMoreMocks { declarator }),
        }
    }

    /// Pop with a `u32` observation.
    pub fn pop_with_u32_spy(
        &mut self,
        declarator: &'static str,
        spy: u32,
    ) -> Result<Option<Cow<'_, [u8]>>, MockError> {
        let bytes = spy.to_le_bytes();
        self.pop(declarator, Some(&bytes))
    }

    /// Record an observation for `declarator` without any seeded mock.
    ///
    /// Synthesizes an already-consumed entry whose sole purpose is to carry
    /// the spy bytes and the call order.
    pub fn spy_only(&mut self, declarator: &'static str, spy: &[u8]) -> Result<(), MockError> {
        let offset = self.alloc_entry(declarator, 0, true, None)?;
        let spy = (!spy.is_empty()).then_some(spy);
        self.record_consumption(offset, spy)
    }

    /// Record a `u32` observation without any seeded mock.
    pub fn spy_on_u32(&mut self, declarator: &'static str, spy: u32) -> Result<(), MockError> {
        self.spy_only(declarator, &spy.to_le_bytes())
    }

    /// Find the next unconsumed entry for `declarator` in arena order.
    ///
    /// Under call-order tracking, passing any unconsumed non-override entry
    /// on the way is an out-of-order pop, reported against the declarator
    /// being popped.
    fn next_unconsumed(&self, declarator: &'static str) -> Result<usize, MockError> {
        let id = self.names.lookup(declarator);
        let tracking = self.arena.order_tracking();
        for (offset, header) in Entries::new(&self.arena, self.layout) {
            if header.call_order != 0 {
                continue;
            }
            if Some(header.declarator) == id {
                return Ok(offset);
            }
            if tracking
                && classify(&self.arena, self.layout, offset, &header) != EntryKind::Override
            {
                return Err(MockError::OutOfOrder { declarator });
            }
        }
        Err(MockError::NoMoreMocks { declarator })
    }

    /// Serve a pop from an override entry.
    ///
    /// The entry is never consumed; a lazily allocated counter word in the
    /// high region tracks its per-declarator call count. The spy bytes are
    /// handed to the handler, not stored.
    fn invoke_override(
        &mut self,
        offset: usize,
        header: &EntryHeader,
        spy: Option<&[u8]>,
    ) -> Result<Option<Vec<u8>>, MockError> {
        let declarator = self.names.resolve(header.declarator);
        let counter_offset = match header.call_data() {
            Some(block) => block,
            None => {
                let block = self.arena.alloc_high(ALIGN, declarator)?;
                self.arena.set_word(block, 0);
                let mut updated = *header;
                updated.call_data_offset = (block / ALIGN) as u32;
                write_entry(&mut self.arena, self.layout, offset, &updated);
                block
            }
        };
        let count = self.arena.word(counter_offset) + 1;
        self.arena.set_word(counter_offset, count);
        let order = self.arena.bump_call_count();
        let slot = self.arena.word(codec::body_offset(self.layout, offset)) as usize;
        Ok(self.handlers[slot](order, count, spy))
    }

    /// Serve a pop from a reusable/infinite entry.
    fn pop_extended(
        &mut self,
        offset: usize,
        header: EntryHeader,
        kind: EntryKind,
        spy: Option<&[u8]>,
    ) -> Result<Option<Cow<'_, [u8]>>, MockError> {
        let declarator = self.names.resolve(header.declarator);
        let spy_len = spy.map_or(0, <[u8]>::len);
        if spy_len >= 1 << 15 {
            // The block's size field cannot express it.
            return Err(MockError::OutOfSpace {
                declarator,
                requested: spy_len,
                free: self.arena.free_space(),
            });
        }
        if let Some(newest) = header.call_data() {
            // The first consumption fixed the spy capacity; growing is an
            // error, shrinking is fine.
            let capacity = self.chain_capacity(newest);
            if spy_len > capacity {
                return Err(MockError::SpySizeInconsistent {
                    declarator,
                    capacity,
                    requested: spy_len,
                });
            }
        }

        let block = self.arena.alloc_high(CALL_HEADER_SIZE + spy_len, declarator)?;
        let order = self.arena.bump_call_count();
        write_call_header(
            &mut self.arena,
            block,
            &CallHeader {
                call_order: order & 0xFFFF,
                has_spy_data: spy_len > 0,
                size: spy_len as u32,
                prev_offset: header.call_data_offset,
            },
        );
        if let Some(spy) = spy {
            self.arena.copy_in(block + CALL_HEADER_SIZE, spy);
        }

        let meta_offset = codec::extended_meta_offset(self.layout, offset, &header);
        let mut meta = read_extended_meta(&self.arena, meta_offset);
        meta.used_count += 1;
        write_extended_meta(&mut self.arena, meta_offset, &meta);

        let mut updated = header;
        updated.call_data_offset = (block / ALIGN) as u32;
        if kind == EntryKind::Reusable && meta.used_count == meta.count_to_use {
            // The last permitted use consumes the entry.
            updated.call_order = self.layout.order_max();
        }
        write_entry(&mut self.arena, self.layout, offset, &updated);

        let span = codec::payload_span(self.layout, offset, &updated, kind);
        if updated.has_callback {
            let slot = self.arena.word(codec::body_offset(self.layout, offset)) as usize;
            let order_now = self.arena.total_calls();
            let Self {
                arena, callbacks, ..
            } = self;
            let mock = span.map(|(start, len)| arena.bytes(start, len));
            let stored_spy = (spy_len > 0).then(|| arena.bytes(block + CALL_HEADER_SIZE, spy_len));
            callbacks[slot](order_now, mock, stored_spy);
        }
        Ok(span.map(|(start, len)| Cow::Borrowed(self.arena.bytes(start, len))))
    }

    /// Serve a pop from a primitive entry.
    fn pop_primitive(
        &mut self,
        offset: usize,
        spy: Option<&[u8]>,
    ) -> Result<Option<Cow<'_, [u8]>>, MockError> {
        self.record_consumption(offset, spy)?;
        let header = read_entry(&self.arena, self.layout, offset);
        let span = codec::payload_span(self.layout, offset, &header, EntryKind::Primitive);
        if header.has_callback {
            let slot = self.arena.word(codec::body_offset(self.layout, offset)) as usize;
            let spy_span = self.primitive_spy_span(&header);
            let order = self.arena.total_calls();
            let Self {
                arena, callbacks, ..
            } = self;
            let mock = span.map(|(start, len)| arena.bytes(start, len));
            let stored_spy = spy_span.map(|(start, len)| arena.bytes(start, len));
            callbacks[slot](order, mock, stored_spy);
        }
        Ok(span.map(|(start, len)| Cow::Borrowed(self.arena.bytes(start, len))))
    }

    /// Stamp a consumption on a primitive or pure-spy entry.
    ///
    /// The call order goes into the entry header while it fits; once the
    /// global counter reaches the layout's natural maximum the header gets
    /// the sentinel and the true order moves into an extended call-data
    /// block. Compact blocks carry raw spy bytes only, with the exact
    /// length noted in the entry header.
    pub(crate) fn record_consumption(
        &mut self,
        offset: usize,
        spy: Option<&[u8]>,
    ) -> Result<(), MockError> {
        let mut header = read_entry(&self.arena, self.layout, offset);
        let declarator = self.names.resolve(header.declarator);
        let spy_len = spy.map_or(0, <[u8]>::len);
        let order = self.arena.bump_call_count();
        let widen = self.layout.order_needs_widening(order);

        // The entry counts as consumed even if the call-data allocation
        // below fails; a permissive-mode test observes that state.
        header.call_order = if widen { self.layout.order_max() } else { order };
        write_entry(&mut self.arena, self.layout, offset, &header);

        if widen {
            let block = self.arena.alloc_high(CALL_HEADER_SIZE + spy_len, declarator)?;
            write_call_header(
                &mut self.arena,
                block,
                &CallHeader {
                    call_order: order & 0xFFFF,
                    has_spy_data: spy_len > 0,
                    size: spy_len as u32,
                    prev_offset: 0,
                },
            );
            if let Some(spy) = spy {
                self.arena.copy_in(block + CALL_HEADER_SIZE, spy);
            }
            header.call_data_offset = (block / ALIGN) as u32;
        } else if let Some(spy) = spy {
            if spy_len > usize::from(u16::MAX) {
                // The compact length field cannot express it.
                return Err(MockError::OutOfSpace {
                    declarator,
                    requested: spy_len,
                    free: self.arena.free_space(),
                });
            }
            let block = self.arena.alloc_high(spy_len, declarator)?;
            self.arena.copy_in(block, spy);
            header.call_data_offset = (block / ALIGN) as u32;
            header.compact_spy_len = spy_len as u16;
        }
        write_entry(&mut self.arena, self.layout, offset, &header);
        Ok(())
    }
}
