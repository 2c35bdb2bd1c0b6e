//! Linear history of intermediate result files.
//!
//! Every successful operation produces exactly one snapshot file named
//! `tmp<index>` in the snapshot directory. The cursor is the index of the
//! current snapshot, `-1` while the origin document is current. Undo only
//! moves the cursor; the snapshot it lands on is resolved by name.
//!
//! Output is staged in an anonymous temporary file next to the snapshots and
//! renamed into place only when the writer completes, so a cancelled or
//! failed write never leaves a truncated file under a snapshot name.
//!
//! Text is read leniently: bytes that are not valid UTF-8 are replaced with
//! U+FFFD instead of failing the read.

use crate::error::{Outcome, Result, SieveError};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// File name prefix of snapshot files.
pub const SNAPSHOT_PREFIX: &str = "tmp";

pub const DEFAULT_SNAPSHOT_DIR: &str = "tmp";

/// Lines shown by [`Document::preview`] callers.
pub const PREVIEW_LINES: usize = 11;

/// Lines of `reader` with `\n` or `\r\n` removed, decoded lossily.
pub struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LossyLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Lossy lines of `reader`, with read failures attributed to `path`.
pub fn read_lines<'a, R>(
    reader: R,
    path: &'a Path,
) -> impl Iterator<Item = Result<String>> + 'a
where
    R: BufRead + 'a,
{
    LossyLines::new(reader).map(move |line| {
        line.map_err(|e| SieveError::io(format!("failed to read {}", path.display()), e))
    })
}

/// A readable text file: the origin document or one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> Result<BufReader<File>> {
        File::open(&self.path)
            .map(BufReader::new)
            .map_err(|e| SieveError::io(format!("failed to open {}", self.path.display()), e))
    }

    /// All lines of the document.
    pub fn lines(&self) -> Result<impl Iterator<Item = Result<String>> + '_> {
        Ok(read_lines(self.open()?, &self.path))
    }

    /// First `max_lines` lines, each terminated by a newline.
    pub fn preview(&self, max_lines: usize) -> Result<String> {
        let mut buffer = String::new();
        for line in self.lines()?.take(max_lines) {
            buffer.push_str(&line?);
            buffer.push('\n');
        }
        Ok(buffer)
    }
}

#[derive(Debug)]
pub struct SnapshotStore {
    dir: PathBuf,
    origin: Option<Document>,
    committed: usize,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            origin: None,
            committed: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Start a fresh history whose base is `origin`.
    pub fn reset(&mut self, origin: Document) {
        debug!(origin = %origin.path().display(), "history reset");
        self.origin = Some(origin);
        self.committed = 0;
    }

    /// Index of the current snapshot, `-1` when the origin is current.
    pub fn cursor(&self) -> isize {
        self.committed as isize - 1
    }

    pub fn can_undo(&self) -> bool {
        self.committed > 0
    }

    /// The current document, or `None` before anything was loaded.
    pub fn current(&self) -> Option<Document> {
        match self.committed {
            0 => self.origin.clone(),
            n => Some(Document::new(self.snapshot_path(n - 1))),
        }
    }

    /// Path of the snapshot at history `index`.
    pub fn snapshot_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}{}", SNAPSHOT_PREFIX, index))
    }

    /// Whether `path` names a file inside the snapshot directory.
    ///
    /// Such a file cannot serve as an origin: a later commit may replace it.
    pub fn holds(&self, path: &Path) -> Result<bool> {
        let dir = match fs::canonicalize(&self.dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(SieveError::io(
                    format!("failed to resolve {}", self.dir.display()),
                    e,
                ))
            }
        };
        let path = fs::canonicalize(path)
            .map_err(|e| SieveError::io(format!("failed to resolve {}", path.display()), e))?;
        Ok(path.starts_with(dir))
    }

    /// Make sure the snapshot directory exists.
    ///
    /// A non-directory file occupying the path is a configuration error.
    pub fn ensure_dir(&self) -> Result<()> {
        match fs::metadata(&self.dir) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(SieveError::Configuration(format!(
                "'{}' directory is needed but such file exists",
                self.dir.display()
            ))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir_all(&self.dir)
                .map_err(|e| {
                    SieveError::io(format!("failed to create {}", self.dir.display()), e)
                }),
            Err(e) => Err(SieveError::io(
                format!("failed to inspect {}", self.dir.display()),
                e,
            )),
        }
    }

    /// Write the next snapshot with `write` and make it current.
    ///
    /// The cursor advances only when `write` completes. On error or
    /// cancellation the staged output is deleted and history is unchanged.
    pub fn commit<F>(&mut self, write: F) -> Result<Outcome<Document>>
    where
        F: FnOnce(&mut dyn Write) -> Result<Outcome<()>>,
    {
        self.ensure_dir()?;
        let target = self.snapshot_path(self.committed);
        let mut staged = NamedTempFile::new_in(&self.dir).map_err(|e| {
            SieveError::io(format!("failed to create a file in {}", self.dir.display()), e)
        })?;

        let outcome = {
            let mut out = BufWriter::new(staged.as_file_mut());
            let outcome = write(&mut out)?;
            out.flush()
                .map_err(|e| SieveError::io(format!("failed to write {}", target.display()), e))?;
            outcome
        };

        if outcome.is_cancelled() {
            debug!(snapshot = %target.display(), "discarding cancelled snapshot");
            return Ok(Outcome::Cancelled);
        }

        staged
            .persist(&target)
            .map_err(|e| SieveError::io(format!("failed to write {}", target.display()), e.error))?;
        self.committed += 1;
        debug!(snapshot = %target.display(), cursor = self.cursor(), "snapshot committed");
        Ok(Outcome::Completed(Document::new(target)))
    }

    /// Step back one snapshot and return the document that is now current.
    ///
    /// Does nothing when the origin is already current.
    pub fn undo(&mut self) -> Option<Document> {
        if self.committed > 0 {
            self.committed -= 1;
            debug!(cursor = self.cursor(), "undo");
        }
        self.current()
    }
}
