//! Persisted settings: last working directory, last language, and the
//! per-language filter and tagger bindings.
//!
//! The file is plain `key=value`, one entry per line:
//!
//! ```text
//! lastWorkingDirectory=/home/me/corpora
//! lastUsedLanguage=German
//! filterGerman=/home/me/stopwords/de.txt
//! taggerGerman=/opt/tree-tagger/cmd/tree-tagger-german
//! ```
//!
//! Lines that do not split into exactly one key and one value, and binding
//! keys naming an unknown language, are skipped.

use crate::error::{Result, SieveError};
use crate::language::Language;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_FILE: &str = "config";
pub const DEFAULT_WORKING_DIRECTORY: &str = "~";

const LAST_WORKING_DIRECTORY: &str = "lastWorkingDirectory";
const LAST_USED_LANGUAGE: &str = "lastUsedLanguage";
const FILTER_PREFIX: &str = "filter";
const TAGGER_PREFIX: &str = "tagger";

/// Matches `filter<Language>` / `tagger<Language>` keys.
static RE_BINDING_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(filter|tagger)(\w+)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub last_working_directory: PathBuf,
    pub last_used_language: Language,
    pub filters: BTreeMap<Language, PathBuf>,
    pub taggers: BTreeMap<Language, PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            last_working_directory: PathBuf::from(DEFAULT_WORKING_DIRECTORY),
            last_used_language: Language::default(),
            filters: BTreeMap::new(),
            taggers: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Parse settings text, starting from defaults.
    pub fn parse(text: &str) -> Self {
        let mut settings = Settings::default();
        for (number, line) in text.lines().enumerate() {
            let number = number + 1;
            let chunks: Vec<&str> = line.split('=').collect();
            let &[key, value] = chunks.as_slice() else {
                warn!(line = number, "skipping malformed settings line");
                continue;
            };
            if key.is_empty() || value.is_empty() {
                warn!(line = number, "skipping malformed settings line");
                continue;
            }
            if let Err(reason) = settings.apply(key, value) {
                warn!(line = number, key, "skipping settings line: {}", reason);
            }
        }
        settings
    }

    fn apply(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        match key {
            LAST_WORKING_DIRECTORY => self.last_working_directory = PathBuf::from(value),
            LAST_USED_LANGUAGE => self.last_used_language = value.parse()?,
            _ => {
                let caps = RE_BINDING_KEY
                    .captures(key)
                    .ok_or_else(|| format!("unknown key '{}'", key))?;
                let language: Language = caps[2].parse()?;
                let bindings = match &caps[1] {
                    FILTER_PREFIX => &mut self.filters,
                    _ => &mut self.taggers,
                };
                bindings.insert(language, PathBuf::from(value));
            }
        }
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}={}",
            LAST_WORKING_DIRECTORY,
            self.last_working_directory.display()
        );
        let _ = writeln!(out, "{}={}", LAST_USED_LANGUAGE, self.last_used_language);
        for (language, path) in &self.filters {
            let _ = writeln!(out, "{}{}={}", FILTER_PREFIX, language, path.display());
        }
        for (language, path) in &self.taggers {
            let _ = writeln!(out, "{}{}={}", TAGGER_PREFIX, language, path.display());
        }
        out
    }

    /// Load settings from `path`, falling back to defaults when it is missing.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => {
                debug!(path = %path.display(), "settings loaded");
                Ok(Self::parse(&text))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    path = %path.display(),
                    "could not find settings file, running with default settings"
                );
                Ok(Self::default())
            }
            Err(e) => Err(SieveError::io(format!("failed to read {}", path.display()), e)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())
            .map_err(|e| SieveError::io(format!("failed to write {}", path.display()), e))?;
        debug!(path = %path.display(), "settings saved");
        Ok(())
    }
}
