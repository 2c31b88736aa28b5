//! The Arrange-phase registry: seeding mock entries.
//!
//! Every add stamps an entry at the arena's low watermark: a
//! zero-initialised header, then the optional callback slot, then (for
//! reusable/infinite) the extended-meta word, then a defensive copy of the
//! payload bytes. Arena exhaustion is the only failure here.

use stunt_arena::codec::{
    self, write_entry, write_extended_meta, EntryHeader, ExtendedKind, ExtendedMeta, USE_COUNT_MAX,
};
use stunt_arena::{align_up, ALIGN};
use stunt_core::{MockCallback, MockError, OverrideHandler};

use crate::store::MockStore;

impl MockStore {
    /// Seed one mock value for `declarator`, returned by the matching pop.
    ///
    /// The payload bytes are copied in; `callback`, if given, fires when the
    /// mock is popped.
    pub fn add(
        &mut self,
        declarator: &'static str,
        mock: &[u8],
        callback: Option<MockCallback>,
    ) -> Result<(), MockError> {
        let slot = self.register_callback(callback);
        let offset = self.alloc_entry(declarator, mock.len(), false, slot)?;
        self.copy_payload(offset, slot.is_some(), false, mock);
        Ok(())
    }

    /// Seed one `u32` mock value for `declarator`.
    pub fn add_u32(
        &mut self,
        declarator: &'static str,
        mock: u32,
        callback: Option<MockCallback>,
    ) -> Result<(), MockError> {
        self.add(declarator, &mock.to_le_bytes(), callback)
    }

    /// Seed a mock with no payload; the matching pop returns `None`.
    pub fn add_empty(
        &mut self,
        declarator: &'static str,
        callback: Option<MockCallback>,
    ) -> Result<(), MockError> {
        self.add(declarator, &[], callback)
    }

    /// Seed one primitive mock per `mock_size`-byte element of `mocks`,
    /// in order, sharing one callback.
    pub fn add_many(
        &mut self,
        declarator: &'static str,
        mocks: &[u8],
        mock_size: usize,
        callback: Option<MockCallback>,
    ) -> Result<(), MockError> {
        if mock_size == 0 {
            return Ok(());
        }
        let slot = self.register_callback(callback);
        for mock in mocks.chunks_exact(mock_size) {
            let offset = self.alloc_entry(declarator, mock.len(), false, slot)?;
            self.copy_payload(offset, slot.is_some(), false, mock);
        }
        Ok(())
    }

    /// Seed a mock that must be popped exactly `use_count` times.
    pub fn add_reusable(
        &mut self,
        declarator: &'static str,
        mock: &[u8],
        use_count: u32,
        callback: Option<MockCallback>,
    ) -> Result<(), MockError> {
        debug_assert!(use_count <= USE_COUNT_MAX);
        self.add_extended(declarator, mock, ExtendedKind::Reusable, use_count, callback)
    }

    /// Seed a mock that may be popped any number of times, including zero.
    pub fn add_infinite(
        &mut self,
        declarator: &'static str,
        mock: &[u8],
        callback: Option<MockCallback>,
    ) -> Result<(), MockError> {
        self.add_extended(declarator, mock, ExtendedKind::Infinite, 0, callback)
    }

    /// Install a handler that supplants the mock queue for `declarator`:
    /// every future pop returns whatever the handler decides.
    pub fn override_with(
        &mut self,
        declarator: &'static str,
        handler: OverrideHandler,
    ) -> Result<(), MockError> {
        self.handlers.push(handler);
        let slot = (self.handlers.len() - 1) as u32;
        self.alloc_entry(declarator, 0, true, Some(slot))?;
        Ok(())
    }

    fn add_extended(
        &mut self,
        declarator: &'static str,
        mock: &[u8],
        kind: ExtendedKind,
        count_to_use: u32,
        callback: Option<MockCallback>,
    ) -> Result<(), MockError> {
        let slot = self.register_callback(callback);
        let body = codec::EXTENDED_META_SIZE + mock.len();
        let offset = self.alloc_entry(declarator, body, true, slot)?;
        let header = codec::read_entry(&self.arena, self.layout, offset);
        let meta_offset = codec::extended_meta_offset(self.layout, offset, &header);
        write_extended_meta(
            &mut self.arena,
            meta_offset,
            &ExtendedMeta {
                kind,
                count_to_use,
                used_count: 0,
            },
        );
        self.arena.copy_in(meta_offset + codec::EXTENDED_META_SIZE, mock);
        Ok(())
    }

    /// Push a callback into the store's table, returning its slot index.
    fn register_callback(&mut self, callback: Option<MockCallback>) -> Option<u32> {
        callback.map(|callback| {
            self.callbacks.push(callback);
            (self.callbacks.len() - 1) as u32
        })
    }

    /// Stamp a blank entry at the low watermark.
    ///
    /// `body_size` is the byte count after the optional callback slot. The
    /// header's `next_offset` is set to the advanced watermark, which is
    /// what makes the geometric variant detection work.
    pub(crate) fn alloc_entry(
        &mut self,
        declarator: &'static str,
        body_size: usize,
        is_extended: bool,
        callback_slot: Option<u32>,
    ) -> Result<usize, MockError> {
        let id = self.names.intern(declarator);
        let callback = if callback_slot.is_some() {
            codec::CALLBACK_SLOT_SIZE
        } else {
            0
        };
        let size = self.layout.entry_size() + callback + align_up(body_size);
        let offset = self.arena.alloc_low(size, declarator)?;

        let mut header = EntryHeader::blank(id);
        header.next_offset = (self.arena.mock_watermark() / ALIGN) as u32;
        header.is_extended = is_extended;
        header.has_callback = callback_slot.is_some();
        write_entry(&mut self.arena, self.layout, offset, &header);
        if let Some(slot) = callback_slot {
            self.arena.set_word(codec::body_offset(self.layout, offset), slot);
        }
        Ok(offset)
    }

    fn copy_payload(&mut self, offset: usize, has_callback: bool, has_meta: bool, mock: &[u8]) {
        let mut target = codec::body_offset(self.layout, offset);
        if has_callback {
            target += codec::CALLBACK_SLOT_SIZE;
        }
        if has_meta {
            target += codec::EXTENDED_META_SIZE;
        }
        self.arena.copy_in(target, mock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;
    use stunt_arena::codec::{classify, read_entry, read_extended_meta, Entries, EntryKind};

    fn make_store() -> MockStore {
        MockStore::new(StoreConfig::with_arena_size(1024)).unwrap()
    }

    fn kinds(store: &MockStore) -> Vec<EntryKind> {
        Entries::new(&store.arena, store.layout)
            .map(|(offset, header)| classify(&store.arena, store.layout, offset, &header))
            .collect()
    }

    #[test]
    fn add_stamps_a_primitive_entry() {
        let mut store = make_store();
        store.add("f", &0xDEAD_BEEFu32.to_le_bytes(), None).unwrap();
        assert_eq!(kinds(&store), vec![EntryKind::Primitive]);
        // Entry header + one payload word.
        assert_eq!(store.free_space(), 1024 - (store.layout.entry_size() + 4));
    }

    #[test]
    fn add_empty_has_no_payload_bytes() {
        let mut store = make_store();
        store.add_empty("f", None).unwrap();
        assert_eq!(store.free_space(), 1024 - store.layout.entry_size());
        assert_eq!(kinds(&store), vec![EntryKind::Primitive]);
    }

    #[test]
    fn payload_sizes_round_up_to_alignment() {
        let mut store = make_store();
        store.add("f", &[1, 2, 3, 4, 5], None).unwrap();
        assert_eq!(store.free_space(), 1024 - (store.layout.entry_size() + 8));
    }

    #[test]
    fn add_many_seeds_in_order() {
        let mut store = make_store();
        let mocks: Vec<u8> = [10u32, 20, 30]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        store.add_many("f", &mocks, 4, None).unwrap();
        assert_eq!(kinds(&store).len(), 3);
        for (index, expected) in [10u32, 20, 30].into_iter().enumerate() {
            let data = store.mock_data("f", index as u32).unwrap().unwrap();
            assert_eq!(u32::from_le_bytes(data.try_into().unwrap()), expected);
        }
    }

    #[test]
    fn add_many_with_zero_element_size_adds_nothing() {
        let mut store = make_store();
        store.add_many("f", &[], 0, None).unwrap();
        assert_eq!(store.free_space(), 1024);
    }

    #[test]
    fn reusable_entry_carries_tag_and_counters() {
        let mut store = make_store();
        store
            .add_reusable("f", &0x11u32.to_le_bytes(), 3, None)
            .unwrap();
        assert_eq!(kinds(&store), vec![EntryKind::Reusable]);

        let (offset, header) = Entries::new(&store.arena, store.layout).next().unwrap();
        let meta = read_extended_meta(
            &store.arena,
            codec::extended_meta_offset(store.layout, offset, &header),
        );
        assert_eq!(meta.count_to_use, 3);
        assert_eq!(meta.used_count, 0);
    }

    #[test]
    fn infinite_entry_expects_no_uses() {
        let mut store = make_store();
        store.add_infinite("f", &0x22u32.to_le_bytes(), None).unwrap();
        assert_eq!(kinds(&store), vec![EntryKind::Infinite]);
    }

    #[test]
    fn override_entry_is_a_lone_handler_slot() {
        let mut store = make_store();
        store
            .override_with("f", Box::new(|_, _, _| None))
            .unwrap();
        assert_eq!(kinds(&store), vec![EntryKind::Override]);
        assert_eq!(
            store.free_space(),
            1024 - (store.layout.entry_size() + codec::CALLBACK_SLOT_SIZE)
        );
    }

    #[test]
    fn entries_link_through_next_offset() {
        let mut store = make_store();
        store.add("a", &1u32.to_le_bytes(), None).unwrap();
        store.add("b", &[0u8; 8], None).unwrap();
        let headers: Vec<_> = Entries::new(&store.arena, store.layout).collect();
        assert_eq!(headers.len(), 2);
        let (first_offset, first) = headers[0];
        assert_eq!(first_offset, 0);
        assert_eq!(first.next_entry(), headers[1].0);
    }

    #[test]
    fn exhaustion_fails_naming_the_declarator() {
        let mut store = MockStore::new(StoreConfig::with_arena_size(32)).unwrap();
        store.add("fits", &1u32.to_le_bytes(), None).unwrap();
        let result = store.add("does_not", &[0u8; 64], None);
        assert!(matches!(
            result,
            Err(MockError::OutOfSpace {
                declarator: "does_not",
                ..
            })
        ));
    }

    #[test]
    fn an_entry_sized_exactly_to_the_buffer_fits() {
        let mut store = MockStore::new(StoreConfig::with_arena_size(32)).unwrap();
        let payload = vec![0xFFu8; 32 - store.layout.entry_size()];
        store.add("f", &payload, None).unwrap();
        assert_eq!(store.free_space(), 0);
    }

    #[test]
    fn added_header_is_zeroed_except_linkage() {
        let mut store = make_store();
        store.add("f", &9u32.to_le_bytes(), None).unwrap();
        let header = read_entry(&store.arena, store.layout, 0);
        assert_eq!(header.call_order, 0);
        assert_eq!(header.call_data_offset, 0);
        assert_eq!(header.compact_spy_len, 0);
        assert!(!header.is_extended);
        assert!(!header.has_callback);
    }
}
