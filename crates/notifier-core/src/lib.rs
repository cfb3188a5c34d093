//! # Notifier Core
//!
//! The document session manager: open documents, their edit buffers, the
//! notes store format, and the save/revert/close/recent-file policies.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Session                           │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐ │
//! │  │   Config    │ │ RecentFiles │ │   Pending action    │ │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘ │
//! │  ┌────────────────────────────────────────────┐          │
//! │  │                 Documents                  │          │
//! │  │  ┌─────────┐ ┌─────────┐ ┌──────────────┐  │          │
//! │  │  │  Note   │ │  Note   │ │ File (path)  │  │          │
//! │  │  └─────────┘ └─────────┘ └──────────────┘  │          │
//! │  └────────────────────────────────────────────┘          │
//! │                 │ codec (records / files)                │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The UI driver owns exactly one [`Session`] and passes it to every call.
//! Nothing here is global.

pub mod codec;
pub mod command;
pub mod config;
pub mod document;
pub mod event;
pub mod pending;
pub mod prompt;
pub mod recent;
pub mod session;

use std::path::PathBuf;

pub use codec::{FileKind, LoadedFile};
pub use command::{Command, CommandOutcome};
pub use config::Config;
pub use document::{Document, DocumentId, Identity};
pub use event::{EventBus, SessionEvent};
pub use notifier_buffer::{EditBuffer, TextStats};
pub use pending::{CloseChoice, DeleteChoice, PendingAction};
pub use prompt::Prompter;
pub use recent::RecentFiles;
pub use session::{CloseOutcome, SaveAllReport, SaveOutcome, Session};

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Buffer error: {0}")]
    Buffer(#[from] notifier_buffer::BufferError),

    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("No active document")]
    NoActiveDocument,

    #[error("Document {0} is read-only")]
    ReadOnly(DocumentId),

    #[error("Another document already has {} open", .0.display())]
    AlreadyOpen(PathBuf),

    #[error("Document {0} is not a note")]
    NotANote(DocumentId),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("No confirmation is pending")]
    NothingPending,
}
