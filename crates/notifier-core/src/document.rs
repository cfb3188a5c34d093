//! Documents: one open unit of text.
//!
//! ## Identity vs. handle
//!
//! A document has two names. [`DocumentId`] is a handle that never changes
//! while the document is open, so the UI and the pending-action machine can
//! hold on to it. [`Identity`] says where the text lives and *does* change:
//! Save As turns an untitled document into a file-backed one, and open-dedup
//! keys on the new path from then on.

use notifier_buffer::{EditBuffer, TextStats};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::codec::{self, FileKind, LoadedFile};
use crate::config::FileConfig;
use crate::{CoreError, CoreResult};

/// Longest note title shown before it is cut off, in grapheme clusters.
pub const TITLE_MAX_LEN: usize = 30;

/// Title of a note with no visible text.
pub const EMPTY_NOTE_TITLE: &str = "[Empty Note]";

/// Appended to titles of documents with unsaved changes.
pub const MODIFIED_MARKER: &str = " *";

/// Unique identifier for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Creates a new unique document ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a document's text is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Never saved; numbered in creation order
    Untitled { number: usize },
    /// A record of the notes store. Its record index is its position among
    /// the session's notes.
    Note,
    /// Backed by a file at a canonical path
    File { path: PathBuf },
}

/// A single open document.
///
/// `content` is authoritative. `buffer` is the copy the text widget edits in
/// place; it is folded back into `content` on every commit and whenever the
/// selection moves away.
#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    identity: Identity,
    content: String,
    buffer: EditBuffer,
    dirty: bool,
    readonly: bool,
    modified_time: Option<SystemTime>,

    /// Last persisted text of a note; what `revert` goes back to
    baseline: String,
}

impl Document {
    fn with_identity(identity: Identity, content: String, capacity: usize) -> Self {
        Self {
            id: DocumentId::new(),
            identity,
            buffer: EditBuffer::with_text(&content, capacity),
            baseline: String::new(),
            content,
            dirty: false,
            readonly: false,
            modified_time: None,
        }
    }

    /// Creates an unsaved document. Only non-empty initial text counts as a
    /// modification.
    pub fn untitled(number: usize, text: impl Into<String>, capacity: usize) -> Self {
        let mut doc = Self::with_identity(Identity::Untitled { number }, text.into(), capacity);
        doc.dirty = !doc.content.is_empty();
        doc
    }

    /// Creates a note as read from the notes store.
    pub fn note(text: impl Into<String>, capacity: usize) -> Self {
        let mut doc = Self::with_identity(Identity::Note, text.into(), capacity);
        doc.baseline = doc.content.clone();
        doc
    }

    /// Creates a note that is not in the store yet.
    pub fn new_note(text: impl Into<String>, capacity: usize) -> Self {
        let mut doc = Self::with_identity(Identity::Note, text.into(), capacity);
        doc.dirty = !doc.content.is_empty();
        doc
    }

    /// Opens the file at `path`, which should already be canonical.
    ///
    /// Binary files become a read-only placeholder describing the file;
    /// truncated files are read-only too.
    pub fn from_file(
        path: impl AsRef<Path>,
        files: &FileConfig,
        capacity: usize,
    ) -> CoreResult<Self> {
        let path = path.as_ref();
        let loaded = codec::read_file(path, files)?;
        let mut doc = Self::with_identity(
            Identity::File {
                path: path.to_path_buf(),
            },
            String::new(),
            capacity,
        );
        doc.apply_loaded(path, loaded);
        Ok(doc)
    }

    fn apply_loaded(&mut self, path: &Path, loaded: LoadedFile) {
        self.content = match loaded.kind {
            FileKind::Text => loaded.text,
            FileKind::Binary => binary_placeholder(path, loaded.size),
        };
        self.readonly = loaded.kind == FileKind::Binary || loaded.truncated;
        self.modified_time = loaded.modified;
        self.dirty = false;
        self.reset_buffer();
    }

    // ==================== Getters ====================

    /// Returns the document ID.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Returns where the document is persisted.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns the backing file path, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        match &self.identity {
            Identity::File { path } => Some(path),
            _ => None,
        }
    }

    /// Returns true for notes store records.
    pub fn is_note(&self) -> bool {
        self.identity == Identity::Note
    }

    /// Returns true if the document was never saved.
    pub fn is_untitled(&self) -> bool {
        matches!(self.identity, Identity::Untitled { .. })
    }

    /// Returns the authoritative text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns true if the document has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns true if the content must not be written back.
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Returns the file timestamp captured at the last load or save.
    pub fn modified_time(&self) -> Option<SystemTime> {
        self.modified_time
    }

    /// Returns the edit buffer.
    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    /// Returns the edit buffer for the widget to write into.
    ///
    /// Writes become part of the document only through
    /// [`commit_edit`](Self::commit_edit) or [`sync_from_buffer`](Self::sync_from_buffer).
    pub fn buffer_mut(&mut self) -> &mut EditBuffer {
        &mut self.buffer
    }

    /// Returns live word and character counts of the edit buffer.
    pub fn stats(&self) -> TextStats {
        TextStats::of(&self.buffer.text())
    }

    // ==================== Titles ====================

    /// Returns the plain title: the first line of a note, the base name of a
    /// file, or `Untitled-<n>`.
    pub fn title(&self) -> String {
        match &self.identity {
            Identity::Note => note_title(&self.content),
            Identity::File { path } => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Identity::Untitled { number } => format!("Untitled-{}", number),
        }
    }

    /// Returns the title shown on tabs, with a marker when a file or
    /// untitled document is modified.
    pub fn display_title(&self) -> String {
        let title = self.title();
        if self.dirty && !self.is_note() {
            format!("{}{}", title, MODIFIED_MARKER)
        } else {
            title
        }
    }

    /// Returns true if `query_lower` (already lowercased) occurs in the title
    /// or the content, ignoring case.
    pub fn matches(&self, query_lower: &str) -> bool {
        query_lower.is_empty()
            || self.title().to_lowercase().contains(query_lower)
            || self.content.to_lowercase().contains(query_lower)
    }

    // ==================== Editing ====================

    /// Accepts a widget edit of `new_len` bytes and folds it into the content.
    ///
    /// Returns whether the content changed. Edits to read-only documents are
    /// rolled back.
    pub fn commit_edit(&mut self, new_len: usize) -> CoreResult<bool> {
        if self.readonly {
            self.reset_buffer();
            return Err(CoreError::ReadOnly(self.id));
        }
        self.buffer.commit(new_len)?;
        Ok(self.sync_from_buffer())
    }

    /// Folds the buffer into the content, marking the document dirty if they
    /// differ. Returns whether the content changed.
    pub fn sync_from_buffer(&mut self) -> bool {
        if self.buffer.text() == self.content.as_str() {
            return false;
        }
        if self.readonly {
            self.reset_buffer();
            return false;
        }
        self.content = self.buffer.text().into_owned();
        self.dirty = true;
        true
    }

    /// Overwrites the buffer with the content, discarding uncommitted edits.
    pub fn reset_buffer(&mut self) {
        self.buffer.set_text(&self.content);
    }

    // ==================== Persistence ====================

    /// Writes the content to `path` and records it as persisted.
    ///
    /// On failure the document stays dirty and nothing else changes.
    pub fn write_to(&mut self, path: &Path) -> CoreResult<()> {
        if self.readonly {
            return Err(CoreError::ReadOnly(self.id));
        }
        codec::write_file(path, &self.content)?;
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        self.mark_saved(modified);
        Ok(())
    }

    /// Records the current content as persisted.
    pub fn mark_saved(&mut self, modified: Option<SystemTime>) {
        self.dirty = false;
        self.baseline = self.content.clone();
        if modified.is_some() {
            self.modified_time = modified;
        }
    }

    /// Re-identifies the document as backed by `path`.
    pub fn set_path(&mut self, path: PathBuf) {
        self.identity = Identity::File { path };
    }

    /// Throws away unsaved changes. Returns whether the content changed.
    ///
    /// Files are reloaded from disk; a file that vanished, or an untitled
    /// document, is emptied. Notes go back to their last persisted text.
    pub fn revert(&mut self, files: &FileConfig) -> CoreResult<bool> {
        let before = self.content.clone();
        match self.identity.clone() {
            Identity::File { path } if path.exists() => {
                let loaded = codec::read_file(&path, files)?;
                self.apply_loaded(&path, loaded);
            }
            Identity::File { .. } | Identity::Untitled { .. } => {
                self.content.clear();
                self.dirty = false;
                self.reset_buffer();
            }
            Identity::Note => {
                self.content = self.baseline.clone();
                self.dirty = false;
                self.reset_buffer();
            }
        }
        Ok(self.content != before)
    }
}

/// Derives a note title: the first non-blank line, trimmed and cut to
/// [`TITLE_MAX_LEN`] grapheme clusters with `...` appended when longer.
pub fn note_title(content: &str) -> String {
    let Some(line) = content.lines().map(str::trim).find(|line| !line.is_empty()) else {
        return EMPTY_NOTE_TITLE.to_string();
    };

    let mut graphemes = line.graphemes(true);
    let head: String = graphemes.by_ref().take(TITLE_MAX_LEN).collect();
    if graphemes.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

fn binary_placeholder(path: &Path, size: u64) -> String {
    format!("[binary file] {} ({} bytes)", path.display(), size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notifier_buffer::MIN_CAPACITY;
    use tempfile::tempdir;

    /// Types `text` over the whole buffer and commits it.
    fn edit(doc: &mut Document, text: &str) {
        doc.buffer_mut().set_text(text);
        let len = doc.buffer().len();
        doc.commit_edit(len).unwrap();
    }

    #[test]
    fn test_long_title_is_truncated() {
        let title = note_title("  \n  My Note Title is quite long indeed\nbody");
        assert_eq!(title, "My Note Title is quite long in...");
    }

    #[test]
    fn test_short_and_empty_titles() {
        assert_eq!(note_title("Groceries\nmilk"), "Groceries");
        assert_eq!(note_title(""), EMPTY_NOTE_TITLE);
        assert_eq!(note_title(" \n\t\n"), EMPTY_NOTE_TITLE);
        assert_eq!(note_title(&"a".repeat(TITLE_MAX_LEN)), "a".repeat(TITLE_MAX_LEN));
    }

    #[test]
    fn test_title_cuts_on_grapheme_boundary() {
        let line = "é".repeat(31);
        let title = note_title(&line);
        assert_eq!(title, format!("{}...", "é".repeat(30)));
    }

    #[test]
    fn test_new_untitled_is_clean() {
        let doc = Document::untitled(1, "", MIN_CAPACITY);
        assert!(!doc.is_dirty());
        assert!(doc.is_untitled());
        assert_eq!(doc.title(), "Untitled-1");
        assert_eq!(doc.buffer().capacity(), MIN_CAPACITY);
    }

    #[test]
    fn test_commit_edit_sets_dirty() {
        let mut doc = Document::untitled(1, "", MIN_CAPACITY);
        let region = doc.buffer_mut().region_mut();
        region[..2].copy_from_slice(b"hi");
        assert!(doc.commit_edit(2).unwrap());
        assert!(doc.is_dirty());
        assert_eq!(doc.content(), "hi");
        assert_eq!(doc.display_title(), "Untitled-1 *");

        // Same text again is not a change
        assert!(!doc.commit_edit(2).unwrap());
    }

    #[test]
    fn test_commit_past_capacity_keeps_content() {
        let mut doc = Document::untitled(1, "keep", MIN_CAPACITY);
        let capacity = doc.buffer().capacity();
        let err = doc.commit_edit(capacity + 1).unwrap_err();
        assert!(matches!(err, CoreError::Buffer(_)));
        assert_eq!(doc.content(), "keep");
    }

    #[test]
    fn test_from_file_and_title() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("todo.md");
        std::fs::write(&path, "- [ ] write tests\r\n").unwrap();

        let doc = Document::from_file(&path, &FileConfig::default(), MIN_CAPACITY).unwrap();
        assert_eq!(doc.content(), "- [ ] write tests\n");
        assert_eq!(doc.title(), "todo.md");
        assert_eq!(doc.path(), Some(path.as_path()));
        assert!(!doc.is_dirty());
        assert!(!doc.is_readonly());
        assert!(doc.modified_time().is_some());
    }

    #[test]
    fn test_binary_file_is_readonly_placeholder() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("image.raw");
        std::fs::write(&path, [1u8, 0, 2, 0]).unwrap();

        let mut doc = Document::from_file(&path, &FileConfig::default(), MIN_CAPACITY).unwrap();
        assert!(doc.is_readonly());
        assert!(doc.content().starts_with("[binary file]"));
        assert!(doc.content().ends_with("(4 bytes)"));

        doc.buffer_mut().push_str("edit").unwrap();
        let len = doc.buffer().len();
        assert!(matches!(doc.commit_edit(len), Err(CoreError::ReadOnly(_))));
        assert_eq!(doc.buffer().text(), doc.content());
        assert!(matches!(doc.write_to(&path), Err(CoreError::ReadOnly(_))));
    }

    #[test]
    fn test_write_and_revert_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "original").unwrap();

        let mut doc = Document::from_file(&path, &FileConfig::default(), MIN_CAPACITY).unwrap();
        edit(&mut doc, "changed");
        assert!(doc.is_dirty());

        assert!(doc.revert(&FileConfig::default()).unwrap());
        assert_eq!(doc.content(), "original");
        assert!(!doc.is_dirty());

        edit(&mut doc, "saved");
        doc.write_to(&path).unwrap();
        assert!(!doc.is_dirty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "saved");
    }

    #[test]
    fn test_revert_vanished_file_clears() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        std::fs::write(&path, "here").unwrap();

        let mut doc = Document::from_file(&path, &FileConfig::default(), MIN_CAPACITY).unwrap();
        edit(&mut doc, "edited");
        std::fs::remove_file(&path).unwrap();

        doc.revert(&FileConfig::default()).unwrap();
        assert_eq!(doc.content(), "");
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_note_revert_restores_baseline() {
        let mut doc = Document::note("first", MIN_CAPACITY);
        edit(&mut doc, "second");
        doc.revert(&FileConfig::default()).unwrap();
        assert_eq!(doc.content(), "first");
        assert_eq!(doc.buffer().text(), "first");
        assert!(!doc.is_dirty());

        // Nothing left to throw away
        assert!(!doc.revert(&FileConfig::default()).unwrap());
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let doc = Document::note("Shopping List\nEggs and MILK", MIN_CAPACITY);
        assert!(doc.matches("milk"));
        assert!(doc.matches("shopping"));
        assert!(doc.matches(""));
        assert!(!doc.matches("bread"));
    }
}
