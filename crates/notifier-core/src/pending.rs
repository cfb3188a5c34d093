//! Confirmation flow for destructive actions.
//!
//! ```text
//!            close(dirty)                 Save / Discard / Cancel
//!   Idle ─────────────────▶ AwaitingClose ───────────────────────▶ Idle
//!     │
//!     │      delete                        Confirm / Cancel
//!     └───────────────────▶ AwaitingDelete ──────────────────────▶ Idle
//! ```
//!
//! Only one action is pending at a time. Nothing is mutated while waiting,
//! so a second request may simply replace the first.

use crate::document::DocumentId;

/// The destructive action waiting for the user's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingAction {
    #[default]
    Idle,
    /// A dirty document was asked to close
    AwaitingClose(DocumentId),
    /// A note was asked to be deleted
    AwaitingDelete(DocumentId),
}

/// Answer to "close a document with unsaved changes?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseChoice {
    /// Save, then close
    Save,
    /// Close without saving
    Discard,
    /// Keep the document open, unchanged
    Cancel,
}

/// Answer to "delete this note?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteChoice {
    Confirm,
    Cancel,
}

impl PendingAction {
    /// Returns true if nothing awaits confirmation.
    pub fn is_idle(&self) -> bool {
        matches!(self, PendingAction::Idle)
    }

    /// Returns the document the pending action refers to.
    pub fn document(&self) -> Option<DocumentId> {
        match self {
            PendingAction::Idle => None,
            PendingAction::AwaitingClose(id) | PendingAction::AwaitingDelete(id) => Some(*id),
        }
    }

    /// Enters `next`, dropping any unconfirmed earlier request.
    pub(crate) fn request(&mut self, next: PendingAction) {
        if !self.is_idle() && *self != next {
            tracing::warn!("Replacing unconfirmed {:?} with {:?}", self, next);
        }
        *self = next;
    }

    /// Returns the document awaiting close confirmation, if any.
    pub(crate) fn awaiting_close(&self) -> Option<DocumentId> {
        match self {
            PendingAction::AwaitingClose(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the document awaiting delete confirmation, if any.
    pub(crate) fn awaiting_delete(&self) -> Option<DocumentId> {
        match self {
            PendingAction::AwaitingDelete(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns to `Idle`.
    pub(crate) fn reset(&mut self) {
        *self = PendingAction::Idle;
    }
}
