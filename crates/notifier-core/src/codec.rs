//! Persistence formats: the delimiter-separated notes store and plain files.
//!
//! ## Notes store
//!
//! ```text
//! first note
//! --------------
//! second note,
//! spanning lines
//! --------------
//! ```
//!
//! Each record is followed by one newline and the delimiter line. Records
//! that are empty, or that contain a line equal to the delimiter, cannot be
//! represented; everything else survives `parse(serialize(records))`,
//! carriage returns included.
//!
//! The store belongs to the application and is replaced atomically. Plain
//! files belong to the user and are overwritten in place, so their mode and
//! hard links survive a save.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use uuid::Uuid;

use crate::config::FileConfig;
use crate::{CoreError, CoreResult};

/// Line separating records in the notes store.
pub const DELIMITER: &str = "--------------";

/// Splits a notes store into records, in file order.
///
/// Blobs between consecutive delimiters that hold nothing but a line break
/// are dropped rather than kept as empty records. A final record without a
/// trailing delimiter is still returned. Lines split on `\n` only; a `\r`
/// before it is ignored when matching the delimiter and kept everywhere else.
pub fn parse(raw: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut current = String::new();

    for piece in raw.split_inclusive('\n') {
        let line = piece.strip_suffix('\n').unwrap_or(piece);
        if is_delimiter(line) {
            flush_record(&mut current, &mut records);
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    flush_record(&mut current, &mut records);

    records
}

fn is_delimiter(line: &str) -> bool {
    line.strip_suffix('\r').unwrap_or(line) == DELIMITER
}

fn flush_record(current: &mut String, records: &mut Vec<String>) {
    if current.ends_with('\n') {
        current.pop();
    }
    if !current.is_empty() {
        records.push(std::mem::take(current));
    }
    current.clear();
}

/// Joins records into the notes store format. Empty records are skipped.
pub fn serialize<S: AsRef<str>>(records: &[S]) -> String {
    let mut out = String::new();
    for record in records.iter().map(AsRef::as_ref) {
        if record.is_empty() {
            continue;
        }
        out.push_str(record);
        out.push('\n');
        out.push_str(DELIMITER);
        out.push('\n');
    }
    out
}

/// Loads every record of the notes store at `path`.
///
/// A store that does not exist yet is treated as empty; it is created on the
/// first save.
pub fn load_store(path: &Path) -> CoreResult<Vec<String>> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let records = parse(&String::from_utf8_lossy(&bytes));
            tracing::info!("Loaded {} notes from {}", records.len(), path.display());
            Ok(records)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(
                "Notes file {} not found, it will be created on save",
                path.display()
            );
            Ok(Vec::new())
        }
        Err(err) => Err(err.into()),
    }
}

/// Writes `records` as the notes store at `path`, creating its directory.
///
/// The store is written to a uniquely named sibling and renamed over the
/// old one, so a failed save leaves the previous store intact.
pub fn save_store<S: AsRef<str>>(path: &Path, records: &[S]) -> CoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let temp_path = store_temp_path(path)?;
    let result = std::fs::write(&temp_path, serialize(records))
        .and_then(|()| std::fs::rename(&temp_path, path));
    if let Err(err) = result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(err.into());
    }
    tracing::info!("Saved {} notes to {}", records.len(), path.display());
    Ok(())
}

/// Returns `.<name>-<uuid>.tmp` next to `path`.
fn store_temp_path(path: &Path) -> CoreResult<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
    })?;
    let mut temp_name = OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(format!("-{}.tmp", Uuid::new_v4()));
    Ok(path.with_file_name(temp_name))
}

// ==================== Plain files ====================

/// How a file's bytes were classified on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    /// A NUL byte was found; the content was not decoded
    Binary,
}

/// The result of reading a single file.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    /// Decoded text with `\n` line endings; empty for binary files
    pub text: String,

    pub kind: FileKind,

    /// The file exceeded the size cap and `text` holds only its head
    pub truncated: bool,

    /// Size on disk in bytes
    pub size: u64,

    pub modified: Option<SystemTime>,
}

/// Reads a file for editing.
///
/// Allow-listed extensions are always text. Anything else is sniffed: a NUL
/// byte in the first `sniff_len` bytes makes it binary. Other control bytes
/// are accepted.
pub fn read_file(path: &Path, config: &FileConfig) -> CoreResult<LoadedFile> {
    let file = std::fs::File::open(path).map_err(|err| open_error(path, err))?;
    let metadata = file.metadata()?;
    let size = metadata.len();
    let modified = metadata.modified().ok();

    let mut bytes = Vec::new();
    file.take(config.max_file_size).read_to_end(&mut bytes)?;
    let truncated = size > config.max_file_size;

    if !config.is_text_extension(path) && has_nul(&bytes, config.sniff_len) {
        tracing::debug!("{} classified as binary", path.display());
        return Ok(LoadedFile {
            text: String::new(),
            kind: FileKind::Binary,
            truncated: false,
            size,
            modified,
        });
    }

    let mut text = normalize_line_endings(&String::from_utf8_lossy(&bytes));
    if truncated {
        tracing::warn!(
            "{} is {} bytes, truncated to {}",
            path.display(),
            size,
            config.max_file_size
        );
        text.push_str(&format!(
            "\n\n[... file truncated: showing the first {} of {} bytes ...]\n",
            config.max_file_size, size
        ));
    }

    Ok(LoadedFile {
        text,
        kind: FileKind::Text,
        truncated,
        size,
        modified,
    })
}

/// Overwrites the file at `path` with `text` exactly as given.
///
/// The existing file is truncated and rewritten in place, keeping its
/// permissions and hard links. If the destination cannot be opened nothing
/// is touched.
pub fn write_file(path: &Path, text: &str) -> CoreResult<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    Ok(())
}

/// Converts `\r\n` and lone `\r` to `\n`.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn has_nul(bytes: &[u8], sniff_len: usize) -> bool {
    bytes[..bytes.len().min(sniff_len)].contains(&0)
}

fn open_error(path: &Path, err: std::io::Error) -> CoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        CoreError::NotFound(path.to_path_buf())
    } else {
        CoreError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_scenario() {
        let raw = "hello\n--------------\nworld\n--------------\n";
        assert_eq!(parse(raw), vec!["hello", "world"]);
    }

    #[test]
    fn test_parse_final_record_without_delimiter() {
        let raw = "one\n--------------\ntwo\nlines";
        assert_eq!(parse(raw), vec!["one", "two\nlines"]);
    }

    #[test]
    fn test_parse_drops_empty_blobs() {
        let raw = "--------------\n--------------\n\n--------------\nonly\n--------------\n";
        assert_eq!(parse(raw), vec!["only"]);
    }

    #[test]
    fn test_parse_crlf_store_keeps_carriage_returns() {
        let raw = "a\r\nb\r\n--------------\r\nc\r\n--------------\r\n";
        assert_eq!(parse(raw), vec!["a\r\nb\r", "c\r"]);
    }

    #[test]
    fn test_carriage_returns_survive_roundtrip() {
        let records = vec!["line one\r".to_string(), "a\r\nb".to_string()];
        assert_eq!(parse(&serialize(&records)), records);
    }

    #[test]
    fn test_parse_keeps_inner_blank_lines() {
        let raw = "\ntitle\n\nbody\n\n--------------\n";
        assert_eq!(parse(raw), vec!["\ntitle\n\nbody\n"]);
    }

    #[test]
    fn test_serialize_format() {
        let out = serialize(&["hello", "", "multi\nline"]);
        assert_eq!(
            out,
            "hello\n--------------\nmulti\nline\n--------------\n"
        );
    }

    #[test]
    fn test_store_roundtrip_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("notes.txt");
        save_store(&path, &["first", "second\nnote"]).unwrap();
        assert_eq!(load_store(&path).unwrap(), vec!["first", "second\nnote"]);

        save_store(&path, &["replaced"]).unwrap();
        assert_eq!(load_store(&path).unwrap(), vec!["replaced"]);
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![OsString::from("notes.txt")]);
    }

    #[test]
    fn test_missing_store_is_empty() {
        let dir = tempdir().unwrap();
        assert!(load_store(&dir.path().join("nope.txt")).unwrap().is_empty());
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        let err = read_file(&path, &FileConfig::default()).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(p) if p == path));
    }

    #[test]
    fn test_read_normalizes_line_endings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dos.txt");
        std::fs::write(&path, "a\r\nb\rc\n").unwrap();

        let loaded = read_file(&path, &FileConfig::default()).unwrap();
        assert_eq!(loaded.text, "a\nb\nc\n");
        assert_eq!(loaded.kind, FileKind::Text);
        assert!(!loaded.truncated);
        assert_eq!(loaded.size, 7);
        assert!(loaded.modified.is_some());
    }

    #[test]
    fn test_unknown_extension_with_nul_is_binary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, [0x7f, b'E', b'L', b'F', 0, 1, 2]).unwrap();

        let loaded = read_file(&path, &FileConfig::default()).unwrap();
        assert_eq!(loaded.kind, FileKind::Binary);
        assert!(loaded.text.is_empty());
        assert_eq!(loaded.size, 7);
    }

    #[test]
    fn test_control_bytes_without_nul_are_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Makefile");
        std::fs::write(&path, "all:\n\techo \x1b[1mhi\x07\n").unwrap();

        let loaded = read_file(&path, &FileConfig::default()).unwrap();
        assert_eq!(loaded.kind, FileKind::Text);
    }

    #[test]
    fn test_known_extension_skips_sniffing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("odd.txt");
        std::fs::write(&path, b"nul\0inside").unwrap();

        let loaded = read_file(&path, &FileConfig::default()).unwrap();
        assert_eq!(loaded.kind, FileKind::Text);
    }

    #[test]
    fn test_nul_after_sniff_window_is_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data");
        let mut bytes = vec![b'a'; 600];
        bytes.push(0);
        std::fs::write(&path, &bytes).unwrap();

        let loaded = read_file(&path, &FileConfig::default()).unwrap();
        assert_eq!(loaded.kind, FileKind::Text);
    }

    #[test]
    fn test_large_file_is_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.log");
        std::fs::write(&path, "x".repeat(100)).unwrap();

        let config = FileConfig {
            max_file_size: 10,
            ..FileConfig::default()
        };
        let loaded = read_file(&path, &config).unwrap();
        assert!(loaded.truncated);
        assert!(loaded.text.starts_with("xxxxxxxxxx\n\n[... file truncated"));
        assert_eq!(loaded.size, 100);
    }

    #[test]
    fn test_write_file_overwrites_exactly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "old content that is longer").unwrap();

        write_file(&path, "new\r\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\r\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_write_file_keeps_mode_and_links() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("run.sh");
        std::fs::write(&path, "echo hi\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        let link = dir.path().join("run-link.sh");
        std::fs::hard_link(&path, &link).unwrap();
        let neighbour = dir.path().join(".run.sh.tmp");
        std::fs::write(&neighbour, "mine").unwrap();

        write_file(&path, "echo bye\n").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(std::fs::read_to_string(&link).unwrap(), "echo bye\n");
        assert_eq!(std::fs::read_to_string(&neighbour).unwrap(), "mine");
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no").join("such").join("file.txt");
        let err = write_file(&path, "x").unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }

    fn record() -> impl Strategy<Value = String> {
        "[a-z \t\r\n-]{1,40}".prop_filter("not representable", |s| {
            !s.split('\n').any(is_delimiter)
        })
    }

    proptest! {
        #[test]
        fn parse_inverts_serialize(records in prop::collection::vec(record(), 0..12)) {
            prop_assert_eq!(parse(&serialize(&records)), records);
        }
    }
}
