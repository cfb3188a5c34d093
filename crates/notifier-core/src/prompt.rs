//! Interactive flows that need the user's answer.
//!
//! The session never shows dialogs itself. A front end implements
//! [`Prompter`] (file pickers, yes/no boxes, a terminal prompt) and the
//! `*_with` methods below drive the two-step session calls through it.

use std::path::PathBuf;

use crate::document::DocumentId;
use crate::pending::{CloseChoice, DeleteChoice};
use crate::session::{CloseOutcome, SaveOutcome, Session};
use crate::CoreResult;

/// Asks the user things on behalf of the session.
pub trait Prompter {
    /// Picks a file to open. `None` means the user backed out.
    fn pick_open_path(&mut self) -> Option<PathBuf>;

    /// Picks where to save, suggesting `default_name`.
    fn pick_save_path(&mut self, default_name: &str) -> Option<PathBuf>;

    /// Asks what to do with unsaved changes in `title`.
    fn confirm_close(&mut self, title: &str) -> CloseChoice;

    /// Asks whether to delete the note `title`.
    fn confirm_delete(&mut self, title: &str) -> DeleteChoice;

    /// Asks whether unsaved notes may be thrown away by a reload.
    fn confirm_reload(&mut self) -> bool {
        true
    }
}

impl Session {
    /// Picks a file and opens it.
    pub fn open_with(&mut self, prompter: &mut dyn Prompter) -> CoreResult<Option<DocumentId>> {
        match prompter.pick_open_path() {
            Some(path) => self.open(path).map(Some),
            None => Ok(None),
        }
    }

    /// Saves a document, asking for a destination if it has none.
    ///
    /// Returns false if the user backed out of the picker.
    pub fn save_with(&mut self, id: DocumentId, prompter: &mut dyn Prompter) -> CoreResult<bool> {
        match self.save(id)? {
            SaveOutcome::Saved => Ok(true),
            SaveOutcome::NeedsDestination(id) => self.save_as_with(id, prompter),
        }
    }

    /// Asks for a destination and saves there.
    pub fn save_as_with(&mut self, id: DocumentId, prompter: &mut dyn Prompter) -> CoreResult<bool> {
        let default_name = self.default_save_name(id)?;
        match prompter.pick_save_path(&default_name) {
            Some(path) => {
                self.save_as(id, path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Closes a document, asking first if it has unsaved changes.
    ///
    /// Any failure leaves the document open and nothing pending.
    pub fn close_with(
        &mut self,
        id: DocumentId,
        prompter: &mut dyn Prompter,
    ) -> CoreResult<CloseOutcome> {
        let outcome = self.request_close(id)?;
        let CloseOutcome::AwaitingConfirmation(id) = outcome else {
            return Ok(outcome);
        };

        let title = self.document(id)?.title();
        let choice = prompter.confirm_close(&title);
        let result = match self.resolve_close(choice) {
            Ok(CloseOutcome::NeedsDestination(id)) => match self.save_as_with(id, prompter) {
                Ok(true) => self.resolve_close(CloseChoice::Save),
                Ok(false) => self.resolve_close(CloseChoice::Cancel),
                Err(err) => Err(err),
            },
            other => other,
        };
        if result.is_err() {
            self.cancel_pending();
        }
        result
    }

    /// Deletes a note after confirmation. Returns whether it was deleted.
    pub fn delete_with(&mut self, id: DocumentId, prompter: &mut dyn Prompter) -> CoreResult<bool> {
        self.request_delete(id)?;
        let title = self.document(id)?.title();
        let choice = prompter.confirm_delete(&title);
        self.resolve_delete(choice)
    }

    /// Reloads the notes, asking first if that would lose changes.
    /// Returns whether the reload happened.
    pub fn reload_with(&mut self, prompter: &mut dyn Prompter) -> CoreResult<bool> {
        if self.has_unsaved_notes() && !prompter.confirm_reload() {
            return Ok(false);
        }
        self.reload_notes()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::CoreError;
    use std::collections::VecDeque;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    /// Replays canned answers and records what was asked.
    #[derive(Default)]
    struct Scripted {
        open_paths: VecDeque<Option<PathBuf>>,
        save_paths: VecDeque<Option<PathBuf>>,
        close_choices: VecDeque<CloseChoice>,
        delete_choices: VecDeque<DeleteChoice>,
        allow_reload: bool,
        asked: Vec<String>,
    }

    impl Prompter for Scripted {
        fn pick_open_path(&mut self) -> Option<PathBuf> {
            self.asked.push("open".to_string());
            self.open_paths.pop_front().flatten()
        }

        fn pick_save_path(&mut self, default_name: &str) -> Option<PathBuf> {
            self.asked.push(format!("save:{}", default_name));
            self.save_paths.pop_front().flatten()
        }

        fn confirm_close(&mut self, title: &str) -> CloseChoice {
            self.asked.push(format!("close:{}", title));
            self.close_choices.pop_front().unwrap_or(CloseChoice::Cancel)
        }

        fn confirm_delete(&mut self, title: &str) -> DeleteChoice {
            self.asked.push(format!("delete:{}", title));
            self.delete_choices.pop_front().unwrap_or(DeleteChoice::Cancel)
        }

        fn confirm_reload(&mut self) -> bool {
            self.asked.push("reload".to_string());
            self.allow_reload
        }
    }

    fn setup() -> (TempDir, Session) {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.notes.path = dir.path().join("notes.txt");
        config.recent.path = dir.path().join("recent.txt");
        (dir, Session::new(config))
    }

    fn in_dir(dir: &TempDir, name: &str) -> PathBuf {
        dir.path().join(name)
    }

    #[test]
    fn test_open_with_backing_out() {
        let (_dir, mut session) = setup();
        let mut prompter = Scripted::default();
        prompter.open_paths.push_back(None);
        assert_eq!(session.open_with(&mut prompter).unwrap(), None);
        assert!(session.is_empty());
    }

    #[test]
    fn test_save_untitled_asks_for_destination() {
        let (dir, mut session) = setup();
        let id = session.new_document("draft");
        let target = in_dir(&dir, "draft.txt");

        let mut prompter = Scripted::default();
        prompter.save_paths.push_back(Some(target.clone()));
        assert!(session.save_with(id, &mut prompter).unwrap());
        assert_eq!(prompter.asked, vec!["save:untitled-1.txt"]);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "draft");
    }

    #[test]
    fn test_close_with_save_of_untitled() {
        let (dir, mut session) = setup();
        let id = session.new_document("unsaved work");
        let target = in_dir(&dir, "work.txt");

        let mut prompter = Scripted::default();
        prompter.close_choices.push_back(CloseChoice::Save);
        prompter.save_paths.push_back(Some(target.clone()));

        assert_eq!(session.close_with(id, &mut prompter).unwrap(), CloseOutcome::Closed);
        assert!(session.is_empty());
        assert!(session.pending().is_idle());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "unsaved work");
    }

    #[test]
    fn test_close_with_picker_cancelled_keeps_document() {
        let (_dir, mut session) = setup();
        let id = session.new_document("unsaved work");

        let mut prompter = Scripted::default();
        prompter.close_choices.push_back(CloseChoice::Save);
        prompter.save_paths.push_back(None);

        assert_eq!(session.close_with(id, &mut prompter).unwrap(), CloseOutcome::Kept);
        assert_eq!(session.document(id).unwrap().content(), "unsaved work");
        assert!(session.pending().is_idle());
    }

    #[test]
    fn test_close_with_failed_save_resets_pending() {
        let (dir, mut session) = setup();
        let id = session.new_document("text");

        let mut prompter = Scripted::default();
        prompter.close_choices.push_back(CloseChoice::Save);
        prompter
            .save_paths
            .push_back(Some(dir.path().join("missing").join("x.txt")));

        assert!(session.close_with(id, &mut prompter).is_err());
        assert_eq!(session.len(), 1);
        assert!(session.pending().is_idle());
        assert!(session.document(id).unwrap().is_dirty());
    }

    #[test]
    fn test_close_with_clean_document_does_not_ask() {
        let (_dir, mut session) = setup();
        let id = session.new_document("");
        let mut prompter = Scripted::default();
        assert_eq!(session.close_with(id, &mut prompter).unwrap(), CloseOutcome::Closed);
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn test_delete_with_confirmation() {
        let (_dir, mut session) = setup();
        let id = session.new_note("Shopping\neggs");
        let mut prompter = Scripted::default();
        prompter.delete_choices.push_back(DeleteChoice::Cancel);
        prompter.delete_choices.push_back(DeleteChoice::Confirm);

        assert!(!session.delete_with(id, &mut prompter).unwrap());
        assert!(session.delete_with(id, &mut prompter).unwrap());
        assert!(session.is_empty());
        assert_eq!(prompter.asked, vec!["delete:Shopping", "delete:Shopping"]);
    }

    #[test]
    fn test_delete_with_file_is_refused() {
        let (_dir, mut session) = setup();
        let id = session.new_document("");
        let mut prompter = Scripted::default();
        assert!(matches!(
            session.delete_with(id, &mut prompter),
            Err(CoreError::NotANote(_))
        ));
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn test_reload_with_asks_only_when_notes_unsaved() {
        let (_dir, mut session) = setup();
        let mut prompter = Scripted::default();
        assert!(session.reload_with(&mut prompter).unwrap());
        assert!(prompter.asked.is_empty());

        session.new_note("unsaved");
        assert!(!session.reload_with(&mut prompter).unwrap());
        assert_eq!(session.len(), 1);

        prompter.allow_reload = true;
        assert!(session.reload_with(&mut prompter).unwrap());
        assert!(session.is_empty());
        assert!(!Path::new(&session.config().notes.path).exists());
    }
}
