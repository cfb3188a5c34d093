//! Commands a front end can bind to menus and shortcuts.
//!
//! Each variant maps onto one or two session calls. Anything that needs the
//! user's answer comes back as a [`CommandOutcome`] for the front end to act
//! on, so `execute` itself never blocks.

use std::path::PathBuf;

use crate::document::DocumentId;
use crate::session::{CloseOutcome, SaveAllReport, SaveOutcome, Session};
use crate::{CoreError, CoreResult};

/// Built-in session commands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    // Notes
    NewNote,
    AddNote { text: String },
    Duplicate,
    RequestDelete,
    Reload,

    // Files
    NewFile,
    Open { path: Option<PathBuf> },
    Save,
    SaveAs { path: Option<PathBuf> },
    SaveAll,
    Revert,
    Close,

    // Navigation
    Escape,
    Quit,
}

/// What the front end has to do after a command ran.
#[derive(Debug)]
pub enum CommandOutcome {
    /// Nothing further
    Done,
    /// Nothing applied (no selection, empty input, ...)
    Ignored,
    /// Show a file picker, then call `open`
    NeedsOpenPath,
    /// Show a save picker, then call `save_as`
    NeedsDestination(DocumentId),
    /// Show a confirmation, then resolve it
    AwaitingConfirmation(DocumentId),
    /// Result of saving everything
    Saved(SaveAllReport),
    /// Final flush done; the front end should exit
    Quit(SaveAllReport),
}

impl Command {
    /// Returns the command's display name.
    pub fn display_name(&self) -> &str {
        match self {
            Command::NewNote => "New Note",
            Command::AddNote { .. } => "Add Note",
            Command::Duplicate => "Duplicate Note",
            Command::RequestDelete => "Delete Note",
            Command::Reload => "Reload Notes",
            Command::NewFile => "New File",
            Command::Open { .. } => "Open File",
            Command::Save => "Save",
            Command::SaveAs { .. } => "Save As",
            Command::SaveAll => "Save All",
            Command::Revert => "Revert",
            Command::Close => "Close",
            Command::Escape => "Clear Search / Deselect",
            Command::Quit => "Quit",
        }
    }

    /// Returns the conventional shortcut shown next to the menu entry.
    pub fn shortcut(&self) -> Option<&'static str> {
        match self {
            Command::NewNote => Some("Ctrl+N"),
            Command::NewFile => Some("Ctrl+Shift+N"),
            Command::Open { .. } => Some("Ctrl+O"),
            Command::Save => Some("Ctrl+S"),
            Command::SaveAs { .. } => Some("Ctrl+Shift+S"),
            Command::Close => Some("Ctrl+W"),
            Command::RequestDelete => Some("Delete"),
            Command::Duplicate => Some("Ctrl+D"),
            Command::Reload => Some("F5"),
            Command::Escape => Some("Esc"),
            _ => None,
        }
    }

    /// Runs the command against `session`.
    pub fn execute(&self, session: &mut Session) -> CoreResult<CommandOutcome> {
        tracing::debug!("Executing command: {}", self.display_name());

        match self {
            Command::NewNote => {
                session.new_note("");
                Ok(CommandOutcome::Done)
            }
            Command::AddNote { text } => {
                if text.trim().is_empty() {
                    return Ok(CommandOutcome::Ignored);
                }
                session.new_note(text.as_str());
                Ok(CommandOutcome::Done)
            }
            Command::Duplicate => match session.active_id() {
                Some(id) => session.duplicate(id).map(|_| CommandOutcome::Done),
                None => Ok(CommandOutcome::Ignored),
            },
            Command::RequestDelete => match session.active_document() {
                Some(doc) if doc.is_note() => {
                    let id = doc.id();
                    session.request_delete(id)?;
                    Ok(CommandOutcome::AwaitingConfirmation(id))
                }
                _ => Ok(CommandOutcome::Ignored),
            },
            Command::Reload => {
                session.reload_notes()?;
                Ok(CommandOutcome::Done)
            }

            Command::NewFile => {
                session.new_document("");
                Ok(CommandOutcome::Done)
            }
            Command::Open { path } => match path {
                Some(path) => session.open(path).map(|_| CommandOutcome::Done),
                None => Ok(CommandOutcome::NeedsOpenPath),
            },
            Command::Save => match session.active_id() {
                Some(id) => Ok(match session.save(id)? {
                    SaveOutcome::Saved => CommandOutcome::Done,
                    SaveOutcome::NeedsDestination(id) => CommandOutcome::NeedsDestination(id),
                }),
                None if session.has_unsaved_notes() => {
                    session.save_notes()?;
                    Ok(CommandOutcome::Done)
                }
                None => Ok(CommandOutcome::Ignored),
            },
            Command::SaveAs { path } => {
                let id = session.active_id().ok_or(CoreError::NoActiveDocument)?;
                match path {
                    Some(path) => session.save_as(id, path).map(|_| CommandOutcome::Done),
                    None => Ok(CommandOutcome::NeedsDestination(id)),
                }
            }
            Command::SaveAll => Ok(CommandOutcome::Saved(session.save_all())),
            Command::Revert => {
                let id = session.active_id().ok_or(CoreError::NoActiveDocument)?;
                session.revert(id)?;
                Ok(CommandOutcome::Done)
            }
            Command::Close => {
                let id = session.active_id().ok_or(CoreError::NoActiveDocument)?;
                Ok(match session.request_close(id)? {
                    CloseOutcome::AwaitingConfirmation(id) => {
                        CommandOutcome::AwaitingConfirmation(id)
                    }
                    _ => CommandOutcome::Done,
                })
            }

            Command::Escape => {
                session.escape();
                Ok(CommandOutcome::Done)
            }
            Command::Quit => Ok(CommandOutcome::Quit(session.flush())),
        }
    }
}
