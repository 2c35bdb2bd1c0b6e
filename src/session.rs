//! One working session: settings, active language, snapshot history and the
//! cancellation signal, owned by the caller instead of living in globals.
//!
//! Operations run on the blocking thread pool. The worker holds the snapshot
//! store lock for the whole operation, so a new snapshot becomes current only
//! once the worker has finished (streams closed, tagger reaped).

use crate::cancel::CancellationSignal;
use crate::config::Settings;
use crate::error::{Outcome, Result, SieveError};
use crate::language::Language;
use crate::snapshot::{Document, SnapshotStore, PREVIEW_LINES};
use crate::transform::{self, Operation};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn no_document() -> SieveError {
    SieveError::Configuration("no document loaded".to_string())
}

pub struct Session {
    settings: Settings,
    language: Option<Language>,
    store: Arc<Mutex<SnapshotStore>>,
    signal: CancellationSignal,
}

impl Session {
    /// Start a session with `settings`, keeping snapshots in `snapshot_dir`.
    ///
    /// The active language starts as the last one used.
    pub fn new(settings: Settings, snapshot_dir: impl Into<PathBuf>) -> Self {
        let language = Some(settings.last_used_language);
        Self {
            settings,
            language,
            store: Arc::new(Mutex::new(SnapshotStore::new(snapshot_dir))),
            signal: CancellationSignal::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = Some(language);
        self.settings.last_used_language = language;
    }

    pub fn set_filter(&mut self, language: Language, word_list: impl Into<PathBuf>) {
        self.settings.filters.insert(language, word_list.into());
    }

    pub fn set_tagger(&mut self, language: Language, tagger: impl Into<PathBuf>) {
        self.settings.taggers.insert(language, tagger.into());
    }

    /// Handle the foreground uses to cancel whatever is in flight.
    pub fn canceller(&self) -> CancellationSignal {
        self.signal.clone()
    }

    fn store(&self) -> MutexGuard<'_, SnapshotStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `path` the origin of a fresh, empty history.
    ///
    /// Files inside the snapshot directory are refused, since later commits
    /// would overwrite them.
    pub fn load(&mut self, path: &Path) -> Result<Document> {
        File::open(path)
            .map_err(|e| SieveError::io(format!("failed to open {}", path.display()), e))?;
        if self.store().holds(path)? {
            return Err(SieveError::Configuration(format!(
                "{} is a snapshot file; copy it out of '{}' before loading it",
                path.display(),
                self.store().dir().display()
            )));
        }
        let absolute = std::path::absolute(path)
            .map_err(|e| SieveError::io(format!("failed to resolve {}", path.display()), e))?;
        if let Some(parent) = absolute.parent() {
            self.settings.last_working_directory = parent.to_path_buf();
        }

        let origin = Document::new(path);
        self.store().reset(origin.clone());
        info!(document = %path.display(), "document loaded");
        Ok(origin)
    }

    pub fn current(&self) -> Option<Document> {
        self.store().current()
    }

    pub fn cursor(&self) -> isize {
        self.store().cursor()
    }

    pub fn can_undo(&self) -> bool {
        self.store().can_undo()
    }

    /// Step back one operation. No-op when the origin is current.
    pub fn undo(&mut self) -> Option<Document> {
        let current = self.store().undo();
        if let Some(doc) = &current {
            info!(document = %doc.path().display(), "undo");
        }
        current
    }

    /// Leading lines of the current document.
    pub fn preview(&self) -> Result<String> {
        self.current().ok_or_else(no_document)?.preview(PREVIEW_LINES)
    }

    /// Run `operation` on the current document in the background.
    ///
    /// Preconditions are checked before anything is written. A cancelled
    /// operation leaves history exactly as it was.
    pub async fn apply(&mut self, operation: Operation) -> Result<Outcome<Document>> {
        let token = self.signal.reset();
        let input = self.current().ok_or_else(no_document)?;
        let plan = transform::prepare(operation, self.language, &self.settings, input)?;

        info!(%operation, "operation started");
        let store = Arc::clone(&self.store);
        let outcome = tokio::task::spawn_blocking(move || {
            let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
            transform::execute(&plan, &mut store, &token)
        })
        .await
        .map_err(|e| SieveError::Worker(e.to_string()))??;

        match &outcome {
            Outcome::Completed(doc) => {
                info!(%operation, snapshot = %doc.path().display(), "operation completed")
            }
            Outcome::Cancelled => warn!(%operation, "operation cancelled, history unchanged"),
        }
        Ok(outcome)
    }

    /// Copy the current document to `dest`.
    ///
    /// A cancelled export removes the partially written `dest`.
    pub async fn export(&mut self, dest: &Path) -> Result<Outcome<()>> {
        let token = self.signal.reset();
        let source = self.current().ok_or_else(no_document)?;
        let dest = dest.to_path_buf();

        info!(destination = %dest.display(), "saving");
        let outcome = tokio::task::spawn_blocking(move || copy_lines(&source, &dest, &token))
            .await
            .map_err(|e| SieveError::Worker(e.to_string()))??;
        if outcome.is_cancelled() {
            warn!("save cancelled");
        }
        Ok(outcome)
    }
}

fn copy_lines(source: &Document, dest: &Path, token: &CancellationToken) -> Result<Outcome<()>> {
    let lines = source.lines()?;
    let file = File::create(dest)
        .map_err(|e| SieveError::io(format!("failed to create {}", dest.display()), e))?;
    let mut out = BufWriter::new(file);
    let write_err =
        |e: std::io::Error| SieveError::io(format!("failed to write {}", dest.display()), e);

    for line in lines {
        if token.is_cancelled() {
            drop(out);
            fs::remove_file(dest).map_err(write_err)?;
            return Ok(Outcome::Cancelled);
        }
        writeln!(out, "{}", line?).map_err(write_err)?;
    }
    out.flush().map_err(write_err)?;
    Ok(Outcome::Completed(()))
}
