//! # Notifier Buffer
//!
//! The growable edit buffer handed to the text widget, plus text statistics.
//!
//! ## Key Concepts
//!
//! ### Capacity Contract
//! - The widget writes straight into a raw byte region of `capacity + 1` bytes
//! - Growth is negotiated *before* the widget writes (`reserve`, then
//!   re-fetch `region_mut`)
//! - `commit` checks the reported length against the capacity, so a write can
//!   never run past the region and a too-long edit is never silently truncated
//!
//! ### Memory Safety
//! - The region is a slice, so out-of-bounds writes panic instead of
//!   corrupting memory
//! - Committed bytes are always valid UTF-8

mod edit_buffer;
mod stats;

pub use edit_buffer::{EditBuffer, MIN_CAPACITY};
pub use stats::TextStats;

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer operations
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// The widget reported a length the negotiated capacity cannot hold.
    /// This is a logic fault in the caller, not a user-facing condition.
    #[error("Edit of {requested} bytes exceeds buffer capacity {capacity}")]
    CapacityViolation { requested: usize, capacity: usize },

    #[error("Buffer content is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },

    #[error("Invalid byte range {start}..{end} for buffer of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },
}
