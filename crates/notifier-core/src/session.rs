//! The session: every open document plus selection and confirmation state.
//!
//! ## Ownership
//!
//! The UI driver owns one `Session` and passes `&mut Session` into each
//! call. Every method runs to completion before returning, so no locking
//! is needed. A multithreaded host should put the whole `Session` behind
//! one mutex and take it once per call.

use std::path::{Path, PathBuf};

use notifier_buffer::TextStats;

use crate::codec;
use crate::config::Config;
use crate::document::{Document, DocumentId, Identity};
use crate::event::{EventBus, SessionEvent};
use crate::pending::{CloseChoice, DeleteChoice, PendingAction};
use crate::recent::RecentFiles;
use crate::{CoreError, CoreResult};

/// Result of asking to save a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written to its file or to the notes store
    Saved,
    /// The document has never been saved; the UI must pick a destination
    /// and call [`Session::save_as`]
    NeedsDestination(DocumentId),
}

/// Result of asking to close a document or answering a close confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The document was removed
    Closed,
    /// The document has unsaved changes; answer with [`Session::resolve_close`]
    AwaitingConfirmation(DocumentId),
    /// "Save" was chosen for an untitled document. Still pending: call
    /// [`Session::save_as`] and resolve again, or resolve with another choice
    NeedsDestination(DocumentId),
    /// Cancelled; the document is untouched
    Kept,
}

/// What [`Session::save_all`] managed to do.
#[derive(Debug, Default)]
pub struct SaveAllReport {
    /// Documents written successfully, in session order
    pub saved: Vec<DocumentId>,
    /// Untitled documents that need a destination first
    pub needs_destination: Vec<DocumentId>,
    /// File-backed documents whose write failed
    pub failed: Vec<(DocumentId, CoreError)>,
    /// Failure writing the notes store, if it was attempted and failed
    pub notes_error: Option<CoreError>,
}

impl SaveAllReport {
    /// Returns true if nothing was left unsaved.
    pub fn is_complete(&self) -> bool {
        self.needs_destination.is_empty() && self.failed.is_empty() && self.notes_error.is_none()
    }
}

/// The ordered collection of open documents.
#[derive(Debug)]
pub struct Session {
    /// Open documents in tab order
    documents: Vec<Document>,

    /// Index of the active document
    active: Option<usize>,

    /// Destructive action waiting for confirmation
    pending: PendingAction,

    /// Notes were added, duplicated or deleted since the store was written
    notes_dirty: bool,

    /// Number given to the next untitled document
    next_untitled: usize,

    /// Current search query
    query: String,

    recent: RecentFiles,
    config: Config,
    events: EventBus,
}

impl Session {
    /// Creates an empty session. Nothing is read from disk.
    pub fn new(config: Config) -> Self {
        Self {
            documents: Vec::new(),
            active: None,
            pending: PendingAction::Idle,
            notes_dirty: false,
            next_untitled: 1,
            query: String::new(),
            recent: RecentFiles::new(config.recent.max_entries),
            config,
            events: EventBus::new(),
        }
    }

    /// Creates a session with the recent files ledger and the notes store
    /// loaded. An unreadable ledger is logged and replaced by an empty one.
    pub fn load(config: Config) -> CoreResult<Self> {
        let mut session = Self::new(config);
        match RecentFiles::load(&session.config.recent.path, session.config.recent.max_entries) {
            Ok(recent) => session.recent = recent,
            Err(err) => tracing::warn!("Could not load recent files: {}", err),
        }

        let capacity = session.capacity();
        let records = codec::load_store(&session.config.notes.path)?;
        session
            .documents
            .extend(records.into_iter().map(|text| Document::note(text, capacity)));
        Ok(session)
    }

    fn capacity(&self) -> usize {
        self.config.buffer.capacity()
    }

    // ==================== Getters ====================

    /// Returns the open documents in tab order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Returns the number of open documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if no documents are open.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Returns a document by ID.
    pub fn document(&self, id: DocumentId) -> CoreResult<&Document> {
        self.documents
            .iter()
            .find(|doc| doc.id() == id)
            .ok_or(CoreError::DocumentNotFound(id))
    }

    /// Returns a mutable document by ID.
    pub fn document_mut(&mut self, id: DocumentId) -> CoreResult<&mut Document> {
        self.documents
            .iter_mut()
            .find(|doc| doc.id() == id)
            .ok_or(CoreError::DocumentNotFound(id))
    }

    /// Returns the tab index of a document.
    pub fn position(&self, id: DocumentId) -> Option<usize> {
        self.documents.iter().position(|doc| doc.id() == id)
    }

    fn index_of(&self, id: DocumentId) -> CoreResult<usize> {
        self.position(id).ok_or(CoreError::DocumentNotFound(id))
    }

    /// Finds the document backed by `path` (compared as given; pass a
    /// canonical path).
    pub fn find_by_path(&self, path: &Path) -> Option<usize> {
        self.documents.iter().position(|doc| doc.path() == Some(path))
    }

    /// Returns the index of the active document.
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// Returns the ID of the active document.
    pub fn active_id(&self) -> Option<DocumentId> {
        self.active_document().map(Document::id)
    }

    /// Returns the active document.
    pub fn active_document(&self) -> Option<&Document> {
        self.active.and_then(|index| self.documents.get(index))
    }

    /// Returns a mutable reference to the active document.
    pub fn active_document_mut(&mut self) -> Option<&mut Document> {
        self.active.and_then(|index| self.documents.get_mut(index))
    }

    /// Returns the record index of a note within the notes store.
    pub fn note_index(&self, id: DocumentId) -> Option<usize> {
        self.documents
            .iter()
            .filter(|doc| doc.is_note())
            .position(|doc| doc.id() == id)
    }

    /// Returns the action awaiting confirmation.
    pub fn pending(&self) -> PendingAction {
        self.pending
    }

    /// Drops whatever awaits confirmation. Nothing was mutated by the
    /// request, so nothing needs undoing.
    pub fn cancel_pending(&mut self) {
        self.pending.reset();
    }

    /// Returns the recent files ledger.
    pub fn recent(&self) -> &RecentFiles {
        &self.recent
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribes to session events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Returns true if anything would be lost by quitting now.
    pub fn has_unsaved_changes(&self) -> bool {
        self.notes_dirty || self.documents.iter().any(Document::is_dirty)
    }

    /// Returns live counts for the active document's buffer.
    pub fn active_stats(&self) -> Option<TextStats> {
        self.active_document().map(Document::stats)
    }

    fn emit(&self, event: SessionEvent) {
        self.events.emit(event);
    }

    // ==================== Selection ====================

    /// Makes `id` the active document.
    pub fn select(&mut self, id: DocumentId) -> CoreResult<()> {
        let index = self.index_of(id)?;
        self.select_index(index);
        Ok(())
    }

    /// Makes the document at `index` active.
    ///
    /// The previously active document's buffer is folded into its content
    /// first, then the new document's buffer is loaded from its content.
    /// Returns false if `index` is out of range.
    pub fn select_index(&mut self, index: usize) -> bool {
        if index >= self.documents.len() {
            tracing::warn!("Invalid document index: {}", index);
            return false;
        }
        self.reconcile_active();
        self.active = Some(index);
        let doc = &mut self.documents[index];
        doc.reset_buffer();
        let id = doc.id();
        tracing::debug!("Switched to document {}", index);
        self.emit(SessionEvent::DocumentFocused(id));
        true
    }

    /// Clears the selection after saving the active buffer into its document.
    pub fn deselect(&mut self) {
        self.reconcile_active();
        self.active = None;
    }

    /// Accepts a widget edit of `new_len` bytes into the active document.
    ///
    /// Returns whether the content changed.
    pub fn commit_edit(&mut self, new_len: usize) -> CoreResult<bool> {
        let doc = self.active_document_mut().ok_or(CoreError::NoActiveDocument)?;
        let changed = doc.commit_edit(new_len)?;
        let id = doc.id();
        if changed {
            self.emit(SessionEvent::DocumentChanged(id));
        }
        Ok(changed)
    }

    fn reconcile_active(&mut self) {
        if let Some(index) = self.active {
            self.sync_document(index);
        }
    }

    fn sync_document(&mut self, index: usize) {
        if let Some(doc) = self.documents.get_mut(index) {
            if doc.sync_from_buffer() {
                let id = doc.id();
                self.emit(SessionEvent::DocumentChanged(id));
            }
        }
    }

    // ==================== Search ====================

    /// Returns the current search query.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Replaces the search query.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Returns the indices of documents matching `query`, in tab order.
    ///
    /// Matching is a case-insensitive substring test on each document's
    /// title and content. An empty query matches everything.
    pub fn filter(&self, query: &str) -> Vec<usize> {
        let query = query.to_lowercase();
        self.documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| doc.matches(&query))
            .map(|(index, _)| index)
            .collect()
    }

    /// Returns the indices matching the current query.
    pub fn visible(&self) -> Vec<usize> {
        self.filter(&self.query)
    }

    /// Clears the search query if there is one, otherwise deselects.
    pub fn escape(&mut self) {
        if !self.query.is_empty() {
            self.query.clear();
        } else if self.active.is_some() {
            self.deselect();
        }
    }

    // ==================== Creation ====================

    fn push_document(&mut self, doc: Document) -> DocumentId {
        let id = doc.id();
        self.reconcile_active();
        self.documents.push(doc);
        self.active = Some(self.documents.len() - 1);
        self.emit(SessionEvent::DocumentOpened(id));
        self.emit(SessionEvent::DocumentFocused(id));
        id
    }

    /// Creates an untitled document and makes it active.
    pub fn new_document(&mut self, text: impl Into<String>) -> DocumentId {
        let number = self.next_untitled;
        self.next_untitled += 1;
        let doc = Document::untitled(number, text, self.capacity());
        self.push_document(doc)
    }

    /// Appends a note to the notes store and makes it active.
    pub fn new_note(&mut self, text: impl Into<String>) -> DocumentId {
        let doc = Document::new_note(text, self.capacity());
        self.notes_dirty = true;
        self.push_document(doc)
    }

    /// Opens the file at `path`, or activates it if it is already open.
    pub fn open(&mut self, path: impl AsRef<Path>) -> CoreResult<DocumentId> {
        let path = path.as_ref();
        let canonical = match std::fs::canonicalize(path) {
            Ok(canonical) => canonical,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                self.forget(path);
                return Err(CoreError::NotFound(path.to_path_buf()));
            }
            Err(err) => return Err(CoreError::Io(err)),
        };

        if let Some(index) = self.find_by_path(&canonical) {
            tracing::info!("File already open, switching to document {}", index);
            self.select_index(index);
            return Ok(self.documents[index].id());
        }

        let doc = Document::from_file(&canonical, &self.config.files, self.capacity())?;
        if doc.is_readonly() {
            tracing::info!("Opened read-only: {}", canonical.display());
        } else {
            tracing::info!("Opened file: {}", canonical.display());
        }
        let id = self.push_document(doc);
        self.remember(canonical);
        Ok(id)
    }

    fn remember(&mut self, path: PathBuf) {
        self.recent.push(path);
        self.persist_recent();
        self.emit(SessionEvent::RecentFilesChanged);
    }

    /// Drops a vanished file from the ledger.
    fn forget(&mut self, path: &Path) {
        if self.recent.remove(path) {
            tracing::info!("Forgetting missing file: {}", path.display());
            self.persist_recent();
            self.emit(SessionEvent::RecentFilesChanged);
        }
    }

    /// Empties the recent files ledger and persists it.
    pub fn clear_recent(&mut self) -> CoreResult<()> {
        self.recent.clear();
        self.recent.save(&self.config.recent.path)?;
        self.emit(SessionEvent::RecentFilesChanged);
        Ok(())
    }

    fn persist_recent(&self) {
        if let Err(err) = self.recent.save(&self.config.recent.path) {
            tracing::warn!(
                "Could not write recent files to {}: {}",
                self.config.recent.path.display(),
                err
            );
        }
    }

    // ==================== Saving ====================

    /// Saves a document where it already lives.
    ///
    /// Untitled documents report [`SaveOutcome::NeedsDestination`]. Saving a
    /// note writes the whole notes store. On failure the document stays
    /// dirty.
    pub fn save(&mut self, id: DocumentId) -> CoreResult<SaveOutcome> {
        let index = self.index_of(id)?;
        self.sync_document(index);

        match self.documents[index].identity().clone() {
            Identity::Untitled { .. } => Ok(SaveOutcome::NeedsDestination(id)),
            Identity::Note => {
                self.save_notes()?;
                Ok(SaveOutcome::Saved)
            }
            Identity::File { path } => {
                self.documents[index].write_to(&path)?;
                tracing::info!("Saved file: {}", path.display());
                self.emit(SessionEvent::DocumentSaved(id));
                self.remember(path);
                Ok(SaveOutcome::Saved)
            }
        }
    }

    /// Writes every note to the notes store, in tab order.
    pub fn save_notes(&mut self) -> CoreResult<()> {
        self.reconcile_active();
        let records: Vec<&str> = self
            .documents
            .iter()
            .filter(|doc| doc.is_note())
            .map(Document::content)
            .collect();
        codec::save_store(&self.config.notes.path, &records)?;

        let mut saved = Vec::new();
        for doc in self.documents.iter_mut().filter(|doc| doc.is_note()) {
            if doc.is_dirty() {
                saved.push(doc.id());
            }
            doc.mark_saved(None);
        }
        self.notes_dirty = false;
        for id in saved {
            self.emit(SessionEvent::DocumentSaved(id));
        }
        Ok(())
    }

    /// Writes a document to `destination` and re-identifies it with that
    /// path. Later saves go there, and open-dedup keys on it.
    pub fn save_as(&mut self, id: DocumentId, destination: impl AsRef<Path>) -> CoreResult<()> {
        let index = self.index_of(id)?;
        let canonical = canonical_destination(destination.as_ref())?;
        if let Some(other) = self.find_by_path(&canonical) {
            if other != index {
                return Err(CoreError::AlreadyOpen(canonical));
            }
        }

        self.sync_document(index);
        let doc = &mut self.documents[index];
        doc.write_to(&canonical)?;
        let was_note = doc.is_note();
        doc.set_path(canonical.clone());
        if was_note {
            // The note left the store
            self.notes_dirty = true;
        }

        tracing::info!("Saved file as: {}", canonical.display());
        self.emit(SessionEvent::DocumentRenamed(id, canonical.clone()));
        self.emit(SessionEvent::DocumentSaved(id));
        self.remember(canonical);
        Ok(())
    }

    /// Saves every dirty document, in tab order.
    ///
    /// Each save is independent: a failure is recorded and the rest are still
    /// attempted. The notes store is written once, at the first dirty note.
    pub fn save_all(&mut self) -> SaveAllReport {
        self.reconcile_active();
        let mut report = SaveAllReport::default();
        let dirty: Vec<(DocumentId, bool)> = self
            .documents
            .iter()
            .filter(|doc| doc.is_dirty())
            .map(|doc| (doc.id(), doc.is_note()))
            .collect();

        let mut notes_attempted = false;
        for (id, is_note) in dirty {
            if is_note {
                if !notes_attempted {
                    notes_attempted = true;
                    self.save_notes_into(&mut report);
                }
                continue;
            }
            match self.save(id) {
                Ok(SaveOutcome::Saved) => report.saved.push(id),
                Ok(SaveOutcome::NeedsDestination(id)) => report.needs_destination.push(id),
                Err(err) => {
                    tracing::warn!("Failed to save document {}: {}", id, err);
                    report.failed.push((id, err));
                }
            }
        }

        if self.notes_dirty && !notes_attempted {
            self.save_notes_into(&mut report);
        }
        report
    }

    fn save_notes_into(&mut self, report: &mut SaveAllReport) {
        let dirty_notes: Vec<DocumentId> = self
            .documents
            .iter()
            .filter(|doc| doc.is_note() && doc.is_dirty())
            .map(Document::id)
            .collect();
        match self.save_notes() {
            Ok(()) => report.saved.extend(dirty_notes),
            Err(err) => {
                tracing::warn!("Failed to save notes: {}", err);
                report.notes_error = Some(err);
            }
        }
    }

    /// Discards a document's unsaved changes. Never asks for confirmation.
    pub fn revert(&mut self, id: DocumentId) -> CoreResult<()> {
        let index = self.index_of(id)?;
        self.sync_document(index);
        if self.documents[index].revert(&self.config.files)? {
            self.emit(SessionEvent::DocumentChanged(id));
        }
        Ok(())
    }

    /// Saves what can be saved before exit and persists the ledger.
    pub fn flush(&mut self) -> SaveAllReport {
        let report = if self.config.notes.save_on_exit {
            self.save_all()
        } else {
            SaveAllReport::default()
        };
        self.persist_recent();
        report
    }

    /// Replaces every note with the notes store's current contents.
    ///
    /// Unsaved note changes are lost; ask first. On a read failure nothing
    /// changes.
    pub fn reload_notes(&mut self) -> CoreResult<()> {
        let records = codec::load_store(&self.config.notes.path)?;
        self.reconcile_active();
        self.documents.retain(|doc| !doc.is_note());

        let capacity = self.capacity();
        self.documents
            .extend(records.into_iter().map(|text| Document::note(text, capacity)));
        self.active = None;
        self.notes_dirty = false;
        self.pending.reset();
        self.emit(SessionEvent::NotesReloaded);
        Ok(())
    }

    /// Returns true if any note has unsaved changes.
    pub fn has_unsaved_notes(&self) -> bool {
        self.notes_dirty
            || self
                .documents
                .iter()
                .any(|doc| doc.is_note() && doc.is_dirty())
    }

    // ==================== Closing ====================

    /// Asks to close a file or untitled document.
    ///
    /// A clean document is removed at once. A dirty one is kept and the
    /// session waits for [`resolve_close`](Self::resolve_close). Notes are
    /// deleted, not closed.
    pub fn request_close(&mut self, id: DocumentId) -> CoreResult<CloseOutcome> {
        let index = self.index_of(id)?;
        if self.documents[index].is_note() {
            return Err(CoreError::InvalidOperation(
                "notes are deleted, not closed".to_string(),
            ));
        }

        self.sync_document(index);
        if self.documents[index].is_dirty() {
            self.pending.request(PendingAction::AwaitingClose(id));
            self.emit(SessionEvent::ConfirmationRequested(id));
            return Ok(CloseOutcome::AwaitingConfirmation(id));
        }

        self.remove_at(index);
        Ok(CloseOutcome::Closed)
    }

    /// Answers the pending close confirmation.
    ///
    /// If saving fails the document stays open and the confirmation stays
    /// pending.
    pub fn resolve_close(&mut self, choice: CloseChoice) -> CoreResult<CloseOutcome> {
        let id = self.pending.awaiting_close().ok_or(CoreError::NothingPending)?;
        let Some(index) = self.position(id) else {
            self.pending.reset();
            return Err(CoreError::DocumentNotFound(id));
        };

        match choice {
            CloseChoice::Cancel => {
                self.pending.reset();
                Ok(CloseOutcome::Kept)
            }
            CloseChoice::Discard => {
                self.pending.reset();
                self.remove_at(index);
                Ok(CloseOutcome::Closed)
            }
            CloseChoice::Save => match self.save(id)? {
                SaveOutcome::NeedsDestination(id) => Ok(CloseOutcome::NeedsDestination(id)),
                SaveOutcome::Saved => {
                    self.pending.reset();
                    let index = self.index_of(id)?;
                    self.remove_at(index);
                    Ok(CloseOutcome::Closed)
                }
            },
        }
    }

    /// Removes the document at `index`, keeping the same document active
    /// when possible.
    fn remove_at(&mut self, index: usize) -> Document {
        self.reconcile_active();
        let doc = self.documents.remove(index);
        let remaining = self.documents.len();

        self.active = match self.active {
            Some(active) if active > index => Some(active - 1),
            Some(active) if active == index => {
                if remaining == 0 {
                    None
                } else {
                    Some(active.min(remaining - 1))
                }
            }
            other => other,
        };
        self.reload_active_buffer();

        if self.pending.document() == Some(doc.id()) {
            self.pending.reset();
        }

        tracing::info!("Closed document {} ({})", index, doc.title());
        self.emit(SessionEvent::DocumentClosed(doc.id()));
        doc
    }

    fn reload_active_buffer(&mut self) {
        if let Some(doc) = self.active_document_mut() {
            doc.reset_buffer();
        }
    }

    // ==================== Notes ====================

    /// Inserts a copy of a note right after it.
    pub fn duplicate(&mut self, id: DocumentId) -> CoreResult<DocumentId> {
        let index = self.index_of(id)?;
        if !self.documents[index].is_note() {
            return Err(CoreError::NotANote(id));
        }
        self.sync_document(index);

        let copy = Document::new_note(self.documents[index].content(), self.capacity());
        let copy_id = copy.id();
        self.documents.insert(index + 1, copy);
        if let Some(active) = self.active {
            if active > index {
                self.active = Some(active + 1);
            }
        }
        self.notes_dirty = true;
        self.emit(SessionEvent::DocumentOpened(copy_id));
        Ok(copy_id)
    }

    /// Asks to delete a note. Answer with [`resolve_delete`](Self::resolve_delete).
    pub fn request_delete(&mut self, id: DocumentId) -> CoreResult<()> {
        let index = self.index_of(id)?;
        if !self.documents[index].is_note() {
            return Err(CoreError::NotANote(id));
        }
        self.pending.request(PendingAction::AwaitingDelete(id));
        self.emit(SessionEvent::ConfirmationRequested(id));
        Ok(())
    }

    /// Answers the pending delete confirmation. Returns whether a note was
    /// removed.
    ///
    /// When the removed note was at or before the active index, the active
    /// index is clamped to the last remaining document (or cleared), and the
    /// active buffer is reloaded.
    pub fn resolve_delete(&mut self, choice: DeleteChoice) -> CoreResult<bool> {
        let id = self.pending.awaiting_delete().ok_or(CoreError::NothingPending)?;
        self.pending.reset();
        if choice == DeleteChoice::Cancel {
            return Ok(false);
        }
        let index = self.index_of(id)?;

        self.reconcile_active();
        let doc = self.documents.remove(index);
        let remaining = self.documents.len();
        if let Some(active) = self.active {
            if index <= active {
                self.active = if remaining == 0 {
                    None
                } else {
                    Some(active.min(remaining - 1))
                };
            }
        }
        self.reload_active_buffer();
        self.notes_dirty = true;

        tracing::info!("Deleted note {}", doc.title());
        self.emit(SessionEvent::DocumentClosed(id));
        Ok(true)
    }

    /// Returns the file name offered when asking where to save a document.
    pub fn default_save_name(&self, id: DocumentId) -> CoreResult<String> {
        let doc = self.document(id)?;
        Ok(match doc.identity() {
            Identity::File { .. } => doc.title(),
            Identity::Untitled { number } => format!("untitled-{}.txt", number),
            Identity::Note => "note.txt".to_string(),
        })
    }
}

/// Resolves where a Save As target will live. The file need not exist, but
/// its directory must.
fn canonical_destination(path: &Path) -> CoreResult<PathBuf> {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return Ok(canonical);
    }
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
    })?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(std::fs::canonicalize(parent)?.join(file_name))
}
