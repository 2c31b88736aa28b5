//! Header layouts: metadata field widths selected from the arena size.
//!
//! Offsets are stored in alignment units, so an 11-bit offset field can
//! address a 4 × 2^11 = 8 KiB buffer. Larger buffers (up to 4 × 2^15 =
//! 128 KiB) need the wide layout, which also widens the entry call-order
//! field from 8 to 32 bits and spreads the header over one extra word.

use crate::buffer::ALIGN;

/// Largest buffer the narrow layout can address.
pub const NARROW_LIMIT: usize = ALIGN << 11;

/// Largest buffer the wide layout can address.
pub const WIDE_LIMIT: usize = ALIGN << 15;

/// Bit width of the call-order field in an extended call-data block.
///
/// Fixed regardless of layout; it is the widest order a block can record.
pub const EXTENDED_ORDER_BITS: u32 = 16;

/// Field-width table for entry headers, selected from the arena size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderLayout {
    /// Buffers up to 8 KiB: 11-bit offsets, 8-bit entry call order, two-word
    /// entry header.
    Narrow,
    /// Buffers up to 128 KiB: 15-bit offsets, 32-bit entry call order,
    /// three-word entry header.
    Wide,
}

impl HeaderLayout {
    /// Select the layout for a buffer of `size` bytes.
    pub fn for_size(size: usize) -> Self {
        if size <= NARROW_LIMIT {
            Self::Narrow
        } else {
            Self::Wide
        }
    }

    /// Bit width of the `next_offset` and `call_data_offset` fields.
    pub fn offset_bits(self) -> u32 {
        match self {
            Self::Narrow => 11,
            Self::Wide => 15,
        }
    }

    /// Bit width of the entry header's `call_order` field.
    pub fn order_bits(self) -> u32 {
        match self {
            Self::Narrow => 8,
            Self::Wide => 32,
        }
    }

    /// Natural maximum of the entry call-order field.
    ///
    /// Doubles as the sentinel meaning "consumed, but the true order lives
    /// in an extended call-data block".
    pub fn order_max(self) -> u32 {
        match self {
            Self::Narrow => (1 << 8) - 1,
            Self::Wide => u32::MAX,
        }
    }

    /// Whether recording this order in an entry header requires widening
    /// into an extended call-data block.
    ///
    /// Only meaningful on layouts whose entry order field is narrower than
    /// the extended block's; the wide layout records any order in place.
    pub fn order_needs_widening(self, order: u32) -> bool {
        self.order_bits() < EXTENDED_ORDER_BITS && order >= self.order_max()
    }

    /// Entry header size in bytes.
    pub fn entry_size(self) -> usize {
        match self {
            Self::Narrow => 2 * ALIGN,
            Self::Wide => 3 * ALIGN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_layout_up_to_8k() {
        assert_eq!(HeaderLayout::for_size(64), HeaderLayout::Narrow);
        assert_eq!(HeaderLayout::for_size(NARROW_LIMIT), HeaderLayout::Narrow);
        assert_eq!(
            HeaderLayout::for_size(NARROW_LIMIT + ALIGN),
            HeaderLayout::Wide
        );
        assert_eq!(HeaderLayout::for_size(WIDE_LIMIT), HeaderLayout::Wide);
    }

    #[test]
    fn narrow_order_maxes_at_255() {
        assert_eq!(HeaderLayout::Narrow.order_max(), 255);
        assert!(!HeaderLayout::Narrow.order_needs_widening(254));
        assert!(HeaderLayout::Narrow.order_needs_widening(255));
        assert!(HeaderLayout::Narrow.order_needs_widening(256));
    }

    #[test]
    fn wide_order_never_widens() {
        assert_eq!(HeaderLayout::Wide.order_max(), u32::MAX);
        assert!(!HeaderLayout::Wide.order_needs_widening(u32::MAX));
    }

    #[test]
    fn offset_fields_address_the_whole_buffer() {
        // The largest representable offset (in alignment units) must reach
        // the end of the largest buffer the layout accepts.
        for (layout, limit) in [
            (HeaderLayout::Narrow, NARROW_LIMIT),
            (HeaderLayout::Wide, WIDE_LIMIT),
        ] {
            let max_units = (1usize << layout.offset_bits()) - 1;
            assert!(max_units * ALIGN >= limit - ALIGN);
        }
    }

    #[test]
    fn entry_sizes() {
        assert_eq!(HeaderLayout::Narrow.entry_size(), 8);
        assert_eq!(HeaderLayout::Wide.entry_size(), 12);
    }
}
