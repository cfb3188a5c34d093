//! Session notifications.
//!
//! The session is synchronous, but several observers (status bar, tab strip,
//! window title) care about what it did. `tokio::sync::broadcast` gives each
//! of them its own receiver, and `send` never blocks the session.

use crate::document::DocumentId;
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Things that happened in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A document was created or opened
    DocumentOpened(DocumentId),
    /// A document became active
    DocumentFocused(DocumentId),
    /// A document's content changed
    DocumentChanged(DocumentId),
    /// A document was written to disk
    DocumentSaved(DocumentId),
    /// A document was removed from the session
    DocumentClosed(DocumentId),
    /// Save As gave a document a new path
    DocumentRenamed(DocumentId, PathBuf),
    /// The notes were re-read from the store
    NotesReloaded,
    /// A destructive action now waits for confirmation
    ConfirmationRequested(DocumentId),
    /// The recent files ledger changed
    RecentFilesChanged,
}

/// Event bus for broadcasting session events.
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    pub fn new() -> Self {
        // Capacity of 256 events in the buffer
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    /// Subscribes to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}
