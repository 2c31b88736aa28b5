//! Record codec: bit-packed headers, entry traversal, variant detection.
//!
//! Every record in the arena is described by single-word bit-packed
//! metadata. An entry header is two words (narrow layout) or three (wide):
//! the packed metadata word(s) plus a word carrying the interned declarator
//! id and the exact length of a compact observation. Offsets are stored in
//! alignment units so they fit the narrow fields.
//!
//! Variant detection is geometric for the primitive / pure-spy / override
//! distinction and tag-based where an extended-meta word is present
//! (reusable / infinite).

use stunt_core::DeclaratorId;

use crate::buffer::{Arena, ALIGN};
use crate::layout::HeaderLayout;

/// Size of the callback/handler slot in an entry body: one word holding an
/// index into the store's closure table.
pub const CALLBACK_SLOT_SIZE: usize = ALIGN;

/// Size of the extended-meta word carried by reusable/infinite entries.
pub const EXTENDED_META_SIZE: usize = ALIGN;

/// Size of an extended call-data block header: the packed
/// order/has-spy/size word plus the previous-block link word.
pub const CALL_HEADER_SIZE: usize = 2 * ALIGN;

fn mask(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1 << bits) - 1
    }
}

/// Decoded entry header.
///
/// `next_offset` and `call_data_offset` are in alignment units, exactly as
/// stored; multiply by [`ALIGN`] for byte offsets. A `call_data_offset` of 0
/// means no observation block has been recorded (offset 0 always holds the
/// first entry, never call data, so 0 is free to mean "none").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryHeader {
    /// Offset of the next entry's header, in alignment units.
    pub next_offset: u32,
    /// Distinguishes the primitive variant from the extended ones.
    pub is_extended: bool,
    /// Offset of this entry's newest call-data block, in alignment units.
    pub call_data_offset: u32,
    /// Whether the body starts with a callback/handler slot.
    pub has_callback: bool,
    /// Global call order at last consumption; 0 until consumed; the
    /// layout's `order_max` as a "see extended block" sentinel.
    pub call_order: u32,
    /// Interned declarator identity.
    pub declarator: DeclaratorId,
    /// Exact byte length of a compact (headerless) observation block.
    pub compact_spy_len: u16,
}

impl EntryHeader {
    /// A zeroed header for the given declarator, as every add stamps first.
    pub fn blank(declarator: DeclaratorId) -> Self {
        Self {
            next_offset: 0,
            is_extended: false,
            call_data_offset: 0,
            has_callback: false,
            call_order: 0,
            declarator,
            compact_spy_len: 0,
        }
    }

    /// Byte offset of the next entry's header.
    pub fn next_entry(&self) -> usize {
        self.next_offset as usize * ALIGN
    }

    /// Byte offset of the newest call-data block, if any was recorded.
    pub fn call_data(&self) -> Option<usize> {
        match self.call_data_offset {
            0 => None,
            units => Some(units as usize * ALIGN),
        }
    }
}

/// Read an entry header at the given byte offset.
pub fn read_entry(arena: &Arena, layout: HeaderLayout, offset: usize) -> EntryHeader {
    let meta = arena.word(offset);
    let offset_bits = layout.offset_bits();
    let next_offset = meta & mask(offset_bits);
    let is_extended = meta >> offset_bits & 1 != 0;
    let call_data_offset = meta >> (offset_bits + 1) & mask(offset_bits);
    let has_callback = meta >> (2 * offset_bits + 1) & 1 != 0;
    let (call_order, ident_word) = match layout {
        HeaderLayout::Narrow => (meta >> 24, arena.word(offset + ALIGN)),
        HeaderLayout::Wide => (arena.word(offset + ALIGN), arena.word(offset + 2 * ALIGN)),
    };
    EntryHeader {
        next_offset,
        is_extended,
        call_data_offset,
        has_callback,
        call_order,
        declarator: DeclaratorId((ident_word & 0xFFFF) as u16),
        compact_spy_len: (ident_word >> 16) as u16,
    }
}

/// Write an entry header at the given byte offset.
pub fn write_entry(arena: &mut Arena, layout: HeaderLayout, offset: usize, header: &EntryHeader) {
    let offset_bits = layout.offset_bits();
    debug_assert!(header.next_offset <= mask(offset_bits));
    debug_assert!(header.call_data_offset <= mask(offset_bits));
    debug_assert!(header.call_order <= layout.order_max());
    let mut meta = header.next_offset & mask(offset_bits);
    meta |= u32::from(header.is_extended) << offset_bits;
    meta |= (header.call_data_offset & mask(offset_bits)) << (offset_bits + 1);
    meta |= u32::from(header.has_callback) << (2 * offset_bits + 1);
    let ident_word = u32::from(header.declarator.0) | u32::from(header.compact_spy_len) << 16;
    match layout {
        HeaderLayout::Narrow => {
            meta |= header.call_order << 24;
            arena.set_word(offset, meta);
            arena.set_word(offset + ALIGN, ident_word);
        }
        HeaderLayout::Wide => {
            arena.set_word(offset, meta);
            arena.set_word(offset + ALIGN, header.call_order);
            arena.set_word(offset + 2 * ALIGN, ident_word);
        }
    }
}

/// Variant tag stored in the extended-meta word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtendedKind {
    /// Must be consumed exactly `count_to_use` times.
    Reusable,
    /// May be consumed any number of times.
    Infinite,
}

/// Decoded extended-meta word: variant tag plus the two use counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtendedMeta {
    /// Reusable or infinite.
    pub kind: ExtendedKind,
    /// Required consumption count; 0 for infinite entries.
    pub count_to_use: u32,
    /// Consumptions so far.
    pub used_count: u32,
}

/// Highest representable use counter (14 bits).
pub const USE_COUNT_MAX: u32 = (1 << 14) - 1;

/// Read an extended-meta word at the given byte offset.
pub fn read_extended_meta(arena: &Arena, offset: usize) -> ExtendedMeta {
    let word = arena.word(offset);
    let kind = if word & 0xF == 0 {
        ExtendedKind::Reusable
    } else {
        ExtendedKind::Infinite
    };
    ExtendedMeta {
        kind,
        count_to_use: word >> 4 & USE_COUNT_MAX,
        used_count: word >> 18 & USE_COUNT_MAX,
    }
}

/// Write an extended-meta word at the given byte offset.
pub fn write_extended_meta(arena: &mut Arena, offset: usize, meta: &ExtendedMeta) {
    debug_assert!(meta.count_to_use <= USE_COUNT_MAX);
    debug_assert!(meta.used_count <= USE_COUNT_MAX);
    let tag = match meta.kind {
        ExtendedKind::Reusable => 0,
        ExtendedKind::Infinite => 1,
    };
    let word = tag | (meta.count_to_use & USE_COUNT_MAX) << 4 | (meta.used_count & USE_COUNT_MAX) << 18;
    arena.set_word(offset, word);
}

/// Decoded extended call-data block header.
///
/// One block records one consumption of a reusable/infinite entry, or one
/// consumption whose order overflowed the entry header. Blocks for the same
/// entry chain newest-first through `prev_offset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallHeader {
    /// Global call order of this consumption (16-bit).
    pub call_order: u32,
    /// Whether spy bytes follow the header.
    pub has_spy_data: bool,
    /// Exact spy byte count (15-bit).
    pub size: u32,
    /// Previous block of the same entry, in alignment units; 0 = none.
    pub prev_offset: u32,
}

impl CallHeader {
    /// Byte offset of the previous block in the chain, if any.
    pub fn prev(&self) -> Option<usize> {
        match self.prev_offset {
            0 => None,
            units => Some(units as usize * ALIGN),
        }
    }
}

/// Read an extended call-data block header at the given byte offset.
pub fn read_call_header(arena: &Arena, offset: usize) -> CallHeader {
    let word = arena.word(offset);
    CallHeader {
        call_order: word & 0xFFFF,
        has_spy_data: word >> 16 & 1 != 0,
        size: word >> 17,
        prev_offset: arena.word(offset + ALIGN),
    }
}

/// Write an extended call-data block header at the given byte offset.
pub fn write_call_header(arena: &mut Arena, offset: usize, header: &CallHeader) {
    debug_assert!(header.size < 1 << 15);
    debug_assert_eq!(header.has_spy_data, header.size > 0);
    let word =
        header.call_order & 0xFFFF | u32::from(header.has_spy_data) << 16 | header.size << 17;
    arena.set_word(offset, word);
    arena.set_word(offset + ALIGN, header.prev_offset);
}

/// Iterator over the live entries of the arena's low region, in arena order.
pub struct Entries<'a> {
    arena: &'a Arena,
    layout: HeaderLayout,
    offset: usize,
}

impl<'a> Entries<'a> {
    /// Start an iteration at offset 0.
    pub fn new(arena: &'a Arena, layout: HeaderLayout) -> Self {
        Self {
            arena,
            layout,
            offset: 0,
        }
    }
}

impl Iterator for Entries<'_> {
    type Item = (usize, EntryHeader);

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.arena.mock_watermark() {
            return None;
        }
        let offset = self.offset;
        let header = read_entry(self.arena, self.layout, offset);
        self.offset = header.next_entry();
        Some((offset, header))
    }
}

/// The five record variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// One mock value, consumed by one pop.
    Primitive,
    /// A synthesized consumed entry recording an observation only.
    PureSpy,
    /// A handler supplanting the mock queue for its declarator.
    Override,
    /// One payload serving a fixed number of pops.
    Reusable,
    /// One payload serving any number of pops.
    Infinite,
}

/// Byte offset of an entry's body (first byte after the header).
pub fn body_offset(layout: HeaderLayout, entry_offset: usize) -> usize {
    entry_offset + layout.entry_size()
}

/// Byte offset of the extended-meta word, valid for reusable/infinite
/// entries only.
pub fn extended_meta_offset(layout: HeaderLayout, entry_offset: usize, header: &EntryHeader) -> usize {
    let callback = if header.has_callback { CALLBACK_SLOT_SIZE } else { 0 };
    body_offset(layout, entry_offset) + callback
}

/// Classify an entry from its geometry and, where present, its tag.
///
/// There is no tag byte for the primitive / pure-spy / override
/// distinction: a pure spy is an extended entry whose header is immediately
/// followed by the next entry, and an override is an extended entry whose
/// handler slot is.
pub fn classify(
    arena: &Arena,
    layout: HeaderLayout,
    entry_offset: usize,
    header: &EntryHeader,
) -> EntryKind {
    if !header.is_extended {
        return EntryKind::Primitive;
    }
    let after_callback = extended_meta_offset(layout, entry_offset, header);
    if after_callback == header.next_entry() {
        if header.has_callback {
            EntryKind::Override
        } else {
            EntryKind::PureSpy
        }
    } else {
        match read_extended_meta(arena, after_callback).kind {
            ExtendedKind::Reusable => EntryKind::Reusable,
            ExtendedKind::Infinite => EntryKind::Infinite,
        }
    }
}

/// Whether this variant carries an extended-meta word.
pub fn has_extended_meta(kind: EntryKind) -> bool {
    matches!(kind, EntryKind::Reusable | EntryKind::Infinite)
}

/// Byte span of the mock payload, evaluated defensively.
///
/// Returns `None` for zero-length payloads and for payloads that would
/// start at or past the next entry's header.
pub fn payload_span(
    layout: HeaderLayout,
    entry_offset: usize,
    header: &EntryHeader,
    kind: EntryKind,
) -> Option<(usize, usize)> {
    let mut start = body_offset(layout, entry_offset);
    if header.has_callback {
        start += CALLBACK_SLOT_SIZE;
    }
    if has_extended_meta(kind) {
        start += EXTENDED_META_SIZE;
    }
    let end = header.next_entry();
    if start >= end {
        None
    } else {
        Some((start, end - start))
    }
}
