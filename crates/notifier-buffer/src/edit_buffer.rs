//! Growable edit buffer shared with the text widget.
//!
//! ## Why a raw region?
//!
//! Immediate-mode text widgets edit a byte array in place and then report the
//! new length. Handing them a fixed-size array is how text gets truncated or
//! memory gets overrun. `EditBuffer` keeps that in-place style but makes the
//! size a negotiated contract:
//!
//! ```rust,ignore
//! let needed = widget.required_len();
//! buffer.reserve(needed);              // phase 1: grow before writing
//! let region = buffer.region_mut();    // phase 2: fresh slice, capacity + 1 bytes
//! let new_len = widget.write_into(region);
//! buffer.commit(new_len)?;             // checked against capacity
//! ```

use std::borrow::Cow;
use std::ops::Range;

use crate::{BufferError, BufferResult};

/// Smallest capacity any buffer starts with, so the first keystrokes in an
/// empty document never reallocate.
pub const MIN_CAPACITY: usize = 1024;

/// A byte buffer with an explicit capacity-negotiation contract.
///
/// # Invariants
///
/// - `bytes.len() == capacity + 1` at all times
/// - `len <= capacity`
/// - `bytes[..len]` was valid UTF-8 when it was last committed
/// - `bytes[len] == 0` after every commit
#[derive(Debug, Clone)]
pub struct EditBuffer {
    /// Backing storage, one byte longer than the capacity
    bytes: Vec<u8>,

    /// Committed logical length in bytes
    len: usize,
}

impl EditBuffer {
    /// Creates an empty buffer with the minimum capacity.
    ///
    /// # Example
    /// ```
    /// use notifier_buffer::{EditBuffer, MIN_CAPACITY};
    ///
    /// let buffer = EditBuffer::new();
    /// assert!(buffer.is_empty());
    /// assert_eq!(buffer.capacity(), MIN_CAPACITY);
    /// ```
    pub fn new() -> Self {
        Self::with_capacity(MIN_CAPACITY)
    }

    /// Creates an empty buffer with at least `capacity` bytes of room.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_CAPACITY);
        Self {
            bytes: vec![0; capacity + 1],
            len: 0,
        }
    }

    /// Creates a buffer holding `text`, with at least `min_capacity` bytes.
    pub fn with_text(text: &str, min_capacity: usize) -> Self {
        let mut buffer = Self::with_capacity(min_capacity.max(text.len()));
        buffer.write_committed(text);
        buffer
    }

    // ==================== Measurements ====================

    /// Returns the committed length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing is committed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the largest length `commit` will accept.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len() - 1
    }

    // ==================== Widget Protocol ====================

    /// Grows the buffer so it can hold at least `needed` bytes.
    ///
    /// Existing bytes are preserved and new bytes are zeroed. Capacity at
    /// least doubles on growth so a run of keystrokes reallocates rarely.
    /// Returns the capacity after the call. Any slice obtained from
    /// [`region_mut`](Self::region_mut) before this call is stale.
    pub fn reserve(&mut self, needed: usize) -> usize {
        let capacity = self.capacity();
        if needed > capacity {
            let grown = needed.max(capacity.saturating_mul(2));
            self.bytes.resize(grown + 1, 0);
            tracing::debug!(from = capacity, to = grown, "edit buffer grown");
        }
        self.capacity()
    }

    /// Returns the raw region the widget writes into: exactly `capacity + 1`
    /// bytes, the last one reserved for the terminator.
    pub fn region_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Accepts `new_len` bytes written by the widget as the new content.
    ///
    /// Fails with [`BufferError::CapacityViolation`] if the widget claims
    /// more bytes than were negotiated, and with [`BufferError::InvalidUtf8`]
    /// if the bytes do not decode. On failure the logical length is unchanged.
    pub fn commit(&mut self, new_len: usize) -> BufferResult<()> {
        let capacity = self.capacity();
        if new_len > capacity {
            return Err(BufferError::CapacityViolation {
                requested: new_len,
                capacity,
            });
        }

        if let Err(err) = std::str::from_utf8(&self.bytes[..new_len]) {
            return Err(BufferError::InvalidUtf8 {
                valid_up_to: err.valid_up_to(),
            });
        }

        self.len = new_len;
        self.bytes[new_len] = 0;
        Ok(())
    }

    /// Runs one widget edit through the full two-phase protocol.
    ///
    /// The buffer is grown to `needed` first, then `write` receives the
    /// fresh region and returns the length it wrote, which is committed.
    pub fn edit<F>(&mut self, needed: usize, write: F) -> BufferResult<()>
    where
        F: FnOnce(&mut [u8]) -> usize,
    {
        self.reserve(needed);
        let new_len = write(self.region_mut());
        self.commit(new_len)
    }

    // ==================== Text Access ====================

    /// Returns the committed text.
    ///
    /// The widget may have scribbled over the region since the last commit,
    /// so invalid sequences are replaced rather than trusted.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes[..self.len])
    }

    // ==================== Mutations ====================

    /// Replaces the byte range `range` of the committed text with `text`.
    ///
    /// Both ends of the range must fall on character boundaries.
    pub fn splice(&mut self, range: Range<usize>, text: &str) -> BufferResult<()> {
        let invalid = BufferError::InvalidRange {
            start: range.start,
            end: range.end,
            len: self.len,
        };
        if range.start > range.end || range.end > self.len {
            return Err(invalid);
        }
        let current = std::str::from_utf8(&self.bytes[..self.len]).map_err(|err| {
            BufferError::InvalidUtf8 {
                valid_up_to: err.valid_up_to(),
            }
        })?;
        if !current.is_char_boundary(range.start) || !current.is_char_boundary(range.end) {
            return Err(invalid);
        }

        let old_len = self.len;
        let new_len = old_len - (range.end - range.start) + text.len();
        self.edit(new_len, |region| {
            let insert_end = range.start + text.len();
            region.copy_within(range.end..old_len, insert_end);
            region[range.start..insert_end].copy_from_slice(text.as_bytes());
            new_len
        })
    }

    /// Appends `text` to the committed content.
    pub fn push_str(&mut self, text: &str) -> BufferResult<()> {
        let end = self.len;
        self.splice(end..end, text)
    }

    /// Replaces the whole content. Capacity never shrinks.
    pub fn set_text(&mut self, text: &str) {
        self.reserve(text.len());
        self.write_committed(text);
    }

    /// Empties the buffer, keeping its capacity.
    pub fn clear(&mut self) {
        self.len = 0;
        self.bytes[0] = 0;
    }

    fn write_committed(&mut self, text: &str) {
        let len = text.len();
        self.bytes[..len].copy_from_slice(text.as_bytes());
        self.bytes[len] = 0;
        self.len = len;
    }
}

impl Default for EditBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for EditBuffer {
    fn from(s: &str) -> Self {
        Self::with_text(s, MIN_CAPACITY)
    }
}

impl From<String> for EditBuffer {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}
