//! The dual-ended arena buffer.
//!
//! [`Arena`] is a single fixed-size byte buffer with two bump watermarks:
//! mock entries are allocated from the low end upward, per-call observation
//! blocks from the high end downward. The space between the watermarks is
//! the free region; an allocation that would make them cross fails the test
//! naming the declarator being served. The arena also owns the global call
//! counter and the call-order-tracking flag, since both are reset together
//! with the watermarks.

use stunt_core::MockError;

use crate::config::{ArenaConfig, ConfigError};

/// Alignment unit: every offset exchanged through record metadata is a
/// multiple of this.
pub const ALIGN: usize = 4;

/// Round a size up to the next multiple of the alignment unit.
pub fn align_up(size: usize) -> usize {
    (size + ALIGN - 1) & !(ALIGN - 1)
}

/// Fixed-size dual-ended bump allocator.
///
/// All state for one test lives here. Entries and call-data blocks are
/// non-owning views into the buffer identified purely by byte offset;
/// [`Arena::reset`] invalidates every outstanding offset at once.
pub struct Arena {
    /// Backing storage. Allocated to full capacity at creation, never
    /// resized.
    buf: Vec<u8>,
    /// Next mock-entry allocation starts here; grows upward from 0.
    mock_watermark: usize,
    /// Next call-data allocation ends here; shrinks downward from the
    /// buffer size.
    call_watermark: usize,
    /// Global 1-based call sequence counter.
    call_count: u32,
    /// When set, popping any mock that is not the first unconsumed entry in
    /// arena order is a failure.
    enforce_order: bool,
}

impl Arena {
    /// Create an arena from a validated configuration.
    pub fn new(config: &ArenaConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let size = config.aligned_size();
        Ok(Self {
            buf: vec![0; size],
            mock_watermark: 0,
            call_watermark: size,
            call_count: 0,
            enforce_order: false,
        })
    }

    /// Total buffer size in bytes.
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    /// Bytes left between the two watermarks.
    pub fn free_space(&self) -> usize {
        self.call_watermark - self.mock_watermark
    }

    /// Current low watermark: one past the last allocated entry byte.
    pub fn mock_watermark(&self) -> usize {
        self.mock_watermark
    }

    /// Return all state to its initial values.
    ///
    /// Idempotent. The backing bytes are NOT zeroed — stale content is
    /// overwritten by the next allocations, and nothing reads past the
    /// watermarks.
    pub fn reset(&mut self) {
        self.mock_watermark = 0;
        self.call_watermark = self.buf.len();
        self.call_count = 0;
        self.enforce_order = false;
    }

    /// Allocate `size` bytes (alignment-rounded) from the low end.
    ///
    /// Returns the byte offset of the allocation start. Fails with
    /// [`MockError::OutOfSpace`] naming `declarator` when the low watermark
    /// would cross the high one.
    pub fn alloc_low(&mut self, size: usize, declarator: &'static str) -> Result<usize, MockError> {
        let rounded = align_up(size);
        if self.mock_watermark % ALIGN != 0 {
            return Err(MockError::Unaligned { declarator });
        }
        let start = self.mock_watermark;
        let new_watermark = start + rounded;
        if new_watermark > self.call_watermark {
            return Err(MockError::OutOfSpace {
                declarator,
                requested: rounded,
                free: self.free_space(),
            });
        }
        self.mock_watermark = new_watermark;
        Ok(start)
    }

    /// Allocate `size` bytes (alignment-rounded) from the high end.
    ///
    /// Returns the *new* high watermark: the block occupies
    /// `[returned, previous_watermark)`. Fails with
    /// [`MockError::OutOfSpace`] naming `declarator` when the high watermark
    /// would cross the low one.
    pub fn alloc_high(&mut self, size: usize, declarator: &'static str) -> Result<usize, MockError> {
        let rounded = align_up(size);
        if self.call_watermark % ALIGN != 0 {
            return Err(MockError::Unaligned { declarator });
        }
        if rounded > self.free_space() {
            return Err(MockError::OutOfSpace {
                declarator,
                requested: rounded,
                free: self.free_space(),
            });
        }
        self.call_watermark -= rounded;
        Ok(self.call_watermark)
    }

    /// Global call count so far (0 before the first consumption).
    pub fn total_calls(&self) -> u32 {
        self.call_count
    }

    /// Advance the global call counter and return the new value.
    pub fn bump_call_count(&mut self) -> u32 {
        self.call_count = self.call_count.wrapping_add(1);
        self.call_count
    }

    /// Whether strict call-order tracking is enforced.
    pub fn order_tracking(&self) -> bool {
        self.enforce_order
    }

    /// Switch strict call-order tracking on or off.
    pub fn set_order_tracking(&mut self, enforce: bool) {
        self.enforce_order = enforce;
    }

    /// Read one metadata word at the given byte offset.
    pub fn word(&self, offset: usize) -> u32 {
        let bytes = [
            self.buf[offset],
            self.buf[offset + 1],
            self.buf[offset + 2],
            self.buf[offset + 3],
        ];
        u32::from_le_bytes(bytes)
    }

    /// Write one metadata word at the given byte offset.
    pub fn set_word(&mut self, offset: usize, value: u32) {
        self.buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Borrow `len` raw bytes starting at `offset`.
    pub fn bytes(&self, offset: usize, len: usize) -> &[u8] {
        &self.buf[offset..offset + len]
    }

    /// Copy raw bytes into the buffer at `offset`.
    pub fn copy_in(&mut self, offset: usize, src: &[u8]) {
        self.buf[offset..offset + src.len()].copy_from_slice(src);
    }
}
