//! The Assert-phase query surface: read-only iteration over the arena.
//!
//! Queries address entries by declarator plus a 0-based creation index.
//! For reusable/infinite entries every consumption counts as one index
//! step, so the same entry answers several consecutive indices; an
//! extended entry that was never consumed occupies no index at all.

use stunt_arena::codec::{
    self, classify, has_extended_meta, read_call_header, read_extended_meta, Entries, EntryHeader,
    EntryKind,
};
use stunt_core::MockError;

use crate::store::MockStore;

/// Opaque reference to one entry in the arena.
///
/// Valid until the next [`MockStore::reset`]. Two handles are equal exactly
/// when they reference the same entry of the same store generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockHandle {
    pub(crate) offset: usize,
    pub(crate) declarator: &'static str,
}

impl MockHandle {
    /// The declarator the referenced entry was seeded for.
    pub fn declarator(&self) -> &'static str {
        self.declarator
    }
}

impl MockStore {
    /// The entry answering the i-th creation index for `declarator`, if any.
    pub fn handle(&self, declarator: &'static str, creation_index: u32) -> Option<MockHandle> {
        self.entry_at(declarator, creation_index)
            .map(|(offset, ..)| MockHandle { offset, declarator })
    }

    /// The stored mock payload of the entry at the given creation index.
    ///
    /// `None` for zero-sized payloads (empty mocks, spies, overrides).
    pub fn mock_data(
        &self,
        declarator: &'static str,
        creation_index: u32,
    ) -> Result<Option<&[u8]>, MockError> {
        let (offset, header, kind, _) = self.entry_at(declarator, creation_index).ok_or(
            MockError::NotFound {
                declarator,
                index: creation_index,
            },
        )?;
        Ok(codec::payload_span(self.layout, offset, &header, kind)
            .map(|(start, len)| self.arena.bytes(start, len)))
    }

    /// The spy bytes recorded by the i-th consumption for `declarator`.
    ///
    /// `None` if that consumption spied on nothing (and for overrides,
    /// which hand spy bytes to their handler without storing them).
    pub fn spy_data(
        &self,
        declarator: &'static str,
        creation_index: u32,
    ) -> Result<Option<&[u8]>, MockError> {
        let (_, header, kind, local) = self.entry_at(declarator, creation_index).ok_or(
            MockError::NotFound {
                declarator,
                index: creation_index,
            },
        )?;
        match kind {
            EntryKind::Override => Ok(None),
            EntryKind::Reusable | EntryKind::Infinite => {
                let newest = header
                    .call_data()
                    .expect("a resolved consumption index implies a recorded block");
                let blocks = self.chain_blocks(newest);
                Ok(self.block_spy(blocks[local as usize]))
            }
            EntryKind::Primitive | EntryKind::PureSpy => Ok(self
                .primitive_spy_span(&header)
                .map(|(start, len)| self.arena.bytes(start, len))),
        }
    }

    /// The 1-based global call order of the i-th consumption for
    /// `declarator`; 0 if the entry was never consumed.
    ///
    /// Read from the extended call-data block when the entry header holds
    /// the sentinel. Override entries always answer 0.
    pub fn call_order(
        &self,
        declarator: &'static str,
        creation_index: u32,
    ) -> Result<u32, MockError> {
        let (_, header, kind, local) = self.entry_at(declarator, creation_index).ok_or(
            MockError::NotFound {
                declarator,
                index: creation_index,
            },
        )?;
        match kind {
            EntryKind::Override => Ok(0),
            EntryKind::Reusable | EntryKind::Infinite => {
                let newest = header
                    .call_data()
                    .expect("a resolved consumption index implies a recorded block");
                let blocks = self.chain_blocks(newest);
                Ok(read_call_header(&self.arena, blocks[local as usize]).call_order)
            }
            EntryKind::Primitive | EntryKind::PureSpy => match header.call_data() {
                Some(block) if header.call_order == self.layout.order_max() => {
                    Ok(read_call_header(&self.arena, block).call_order)
                }
                _ => Ok(header.call_order),
            },
        }
    }

    /// Total consumptions across all entries for `declarator`.
    pub fn count_calls(&self, declarator: &'static str) -> u32 {
        let Some(id) = self.names.lookup(declarator) else {
            return 0;
        };
        let mut count = 0;
        for (offset, header) in Entries::new(&self.arena, self.layout) {
            if header.declarator != id {
                continue;
            }
            match classify(&self.arena, self.layout, offset, &header) {
                EntryKind::Primitive | EntryKind::PureSpy => {
                    if header.call_order != 0 {
                        count += 1;
                    }
                }
                EntryKind::Override => {
                    count += header.call_data().map_or(0, |block| self.arena.word(block));
                }
                EntryKind::Reusable | EntryKind::Infinite => {
                    let meta_offset = codec::extended_meta_offset(self.layout, offset, &header);
                    count += read_extended_meta(&self.arena, meta_offset).used_count;
                }
            }
        }
        count
    }

    /// Total expected uses across all entries for `declarator`: primitive,
    /// spy-only and override entries count one each, a reusable counts its
    /// use target, an infinite its past uses.
    pub fn count_callables(&self, declarator: &'static str) -> u32 {
        let Some(id) = self.names.lookup(declarator) else {
            return 0;
        };
        let mut count = 0;
        for (offset, header) in Entries::new(&self.arena, self.layout) {
            if header.declarator != id {
                continue;
            }
            match classify(&self.arena, self.layout, offset, &header) {
                EntryKind::Primitive | EntryKind::PureSpy | EntryKind::Override => count += 1,
                EntryKind::Reusable | EntryKind::Infinite => {
                    let meta_offset = codec::extended_meta_offset(self.layout, offset, &header);
                    let meta = read_extended_meta(&self.arena, meta_offset);
                    count += match meta.kind {
                        codec::ExtendedKind::Reusable => meta.count_to_use,
                        codec::ExtendedKind::Infinite => meta.used_count,
                    };
                }
            }
        }
        count
    }

    /// Whether any non-pure-spy entry exists for `declarator`.
    pub fn has_mocks(&self, declarator: &'static str) -> bool {
        let Some(id) = self.names.lookup(declarator) else {
            return false;
        };
        Entries::new(&self.arena, self.layout).any(|(offset, header)| {
            header.declarator == id
                && classify(&self.arena, self.layout, offset, &header) != EntryKind::PureSpy
        })
    }

    /// Whether any unconsumed entry exists for `declarator`.
    ///
    /// Override entries qualify: their order is never set.
    pub fn has_unconsumed_mocks(&self, declarator: &'static str) -> bool {
        let Some(id) = self.names.lookup(declarator) else {
            return false;
        };
        Entries::new(&self.arena, self.layout)
            .any(|(_, header)| header.declarator == id && header.call_order == 0)
    }

    /// The first unconsumed non-override entry in arena order, if any.
    ///
    /// This is the teardown validation primitive: a `Some` here means a
    /// seeded expectation was never exercised.
    pub fn find_any_unconsumed(&self) -> Option<MockHandle> {
        Entries::new(&self.arena, self.layout).find_map(|(offset, header)| {
            (header.call_order == 0
                && classify(&self.arena, self.layout, offset, &header) != EntryKind::Override)
                .then(|| MockHandle {
                    offset,
                    declarator: self.names.resolve(header.declarator),
                })
        })
    }

    /// Resolve a creation index to its entry and the local consumption
    /// index within it.
    fn entry_at(
        &self,
        declarator: &str,
        creation_index: u32,
    ) -> Option<(usize, EntryHeader, EntryKind, u32)> {
        let id = self.names.lookup(declarator)?;
        let mut remaining = creation_index;
        for (offset, header) in Entries::new(&self.arena, self.layout) {
            if header.declarator != id {
                continue;
            }
            let kind = classify(&self.arena, self.layout, offset, &header);
            if has_extended_meta(kind) {
                let meta_offset = codec::extended_meta_offset(self.layout, offset, &header);
                let used = read_extended_meta(&self.arena, meta_offset).used_count;
                if used > remaining {
                    return Some((offset, header, kind, remaining));
                }
                remaining -= used;
            } else if remaining == 0 {
                return Some((offset, header, kind, 0));
            } else {
                remaining -= 1;
            }
        }
        None
    }

    /// Byte span of a primitive/pure-spy entry's recorded spy bytes.
    ///
    /// Compact blocks are raw bytes with their length in the entry header;
    /// a sentinel order means the bytes sit behind an extended header.
    pub(crate) fn primitive_spy_span(&self, header: &EntryHeader) -> Option<(usize, usize)> {
        let block = header.call_data()?;
        if header.call_order < self.layout.order_max() {
            (header.compact_spy_len > 0).then(|| (block, usize::from(header.compact_spy_len)))
        } else {
            let call = read_call_header(&self.arena, block);
            call.has_spy_data
                .then(|| (block + codec::CALL_HEADER_SIZE, call.size as usize))
        }
    }
}
