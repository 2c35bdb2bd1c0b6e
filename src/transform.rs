//! The four corpus transformations.
//!
//! | Operation | Reads | Keeps per line | Writes |
//! |-----------|-------|----------------|--------|
//! | `strip` | current document | field before the first tab | one word per line |
//! | `filter` | current document | lines whose key is not in the word list | original line |
//! | `count-stats` | tagger output | last tab field, counted | `rank word occurrences` |
//! | `count` | tagger output | last tab field, counted | `word` |
//!
//! Every operation is split in two: [`prepare`] checks the preconditions and
//! resolves the inputs without touching the filesystem, then [`execute`]
//! streams the input into a new snapshot, polling the cancellation token
//! before every line it reads.

use crate::config::Settings;
use crate::error::{Outcome, Result, SieveError};
use crate::language::Language;
use crate::snapshot::{read_lines, Document, SnapshotStore};
use crate::stats::WordStats;
use crate::tagger::TaggerCommand;
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    StripTranslations,
    Filter,
    CountSortWithStats,
    CountSortWithoutStats,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::StripTranslations,
        Operation::Filter,
        Operation::CountSortWithStats,
        Operation::CountSortWithoutStats,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::StripTranslations => "strip",
            Operation::Filter => "filter",
            Operation::CountSortWithStats => "count-stats",
            Operation::CountSortWithoutStats => "count",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| format!("unknown operation '{}'", s))
    }
}

/// An operation whose preconditions hold and whose inputs are resolved.
#[derive(Debug, Clone)]
pub enum Plan {
    StripTranslations { input: Document },
    Filter { input: Document, word_list: PathBuf },
    CountSort { tagger: TaggerCommand, with_stats: bool },
}

/// Check preconditions for `operation` on `input` and resolve its inputs.
///
/// Never opens or creates a file, so configuration problems surface before
/// any output exists.
pub fn prepare(
    operation: Operation,
    language: Option<Language>,
    settings: &Settings,
    input: Document,
) -> Result<Plan> {
    match operation {
        Operation::StripTranslations => Ok(Plan::StripTranslations { input }),
        Operation::Filter => {
            let language = language.ok_or_else(|| {
                SieveError::Configuration("choose the appropriate language".to_string())
            })?;
            let word_list = settings.filters.get(&language).ok_or_else(|| {
                SieveError::Configuration(format!(
                    "no filter file was specified for {}",
                    language
                ))
            })?;
            Ok(Plan::Filter {
                input,
                word_list: word_list.clone(),
            })
        }
        Operation::CountSortWithStats | Operation::CountSortWithoutStats => {
            let tagger = TaggerCommand::resolve(language, &settings.taggers, input.path())?;
            Ok(Plan::CountSort {
                tagger,
                with_stats: operation == Operation::CountSortWithStats,
            })
        }
    }
}

/// Run `plan`, committing its output as the next snapshot in `store`.
pub fn execute(
    plan: &Plan,
    store: &mut SnapshotStore,
    token: &CancellationToken,
) -> Result<Outcome<Document>> {
    match plan {
        Plan::StripTranslations { input } => {
            store.commit(|out| strip_translations(input.lines()?, out, token))
        }
        Plan::Filter { input, word_list } => store.commit(|out| {
            let words = match load_word_list(word_list, token)? {
                Outcome::Completed(words) => words,
                Outcome::Cancelled => return Ok(Outcome::Cancelled),
            };
            debug!(words = words.len(), list = %word_list.display(), "filter list loaded");
            filter_lines(input.lines()?, &words, out, token)
        }),
        Plan::CountSort { tagger, with_stats } => {
            store.commit(|out| count_sort(tagger, *with_stats, out, token))
        }
    }
}

/// Split `line` on `sep`, dropping trailing empty fields.
///
/// An empty line has a single empty field; a line made only of separators
/// has none.
pub fn split_fields(line: &str, sep: char) -> Vec<&str> {
    if line.is_empty() {
        return vec![""];
    }
    let mut fields: Vec<&str> = line.split(sep).collect();
    while fields.last() == Some(&"") {
        fields.pop();
    }
    fields
}

/// The part of an `word<TAB>translation` line before the first tab.
pub fn strip_translation(line: &str) -> &str {
    line.split('\t').next().unwrap_or(line)
}

/// The word a filter decision is made on: the whole line when it is a single
/// field, the middle field of a `rank word occurrences` line, otherwise none.
pub fn filter_key(line: &str) -> Option<&str> {
    match split_fields(line, ' ').as_slice() {
        [word] => Some(*word),
        [_, word, _] => Some(*word),
        _ => None,
    }
}

/// The last tab-separated field of a tagger line, if non-empty.
pub fn tagged_word(line: &str) -> Option<&str> {
    split_fields(line, '\t')
        .last()
        .copied()
        .filter(|word| !word.is_empty())
}

fn emit(out: &mut dyn Write, line: &str) -> Result<()> {
    writeln!(out, "{}", line).map_err(|e| SieveError::io("failed to write snapshot", e))
}

fn strip_translations<I>(
    lines: I,
    out: &mut dyn Write,
    token: &CancellationToken,
) -> Result<Outcome<()>>
where
    I: Iterator<Item = Result<String>>,
{
    for line in lines {
        if token.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
        emit(out, strip_translation(&line?))?;
    }
    Ok(Outcome::Completed(()))
}

fn load_word_list(path: &Path, token: &CancellationToken) -> Result<Outcome<HashSet<String>>> {
    let file = File::open(path).map_err(|e| {
        SieveError::io(format!("failed to open filter file {}", path.display()), e)
    })?;
    let mut words = HashSet::new();
    for line in read_lines(BufReader::new(file), path) {
        if token.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
        words.insert(line?);
    }
    Ok(Outcome::Completed(words))
}

fn filter_lines<I>(
    lines: I,
    words: &HashSet<String>,
    out: &mut dyn Write,
    token: &CancellationToken,
) -> Result<Outcome<()>>
where
    I: Iterator<Item = Result<String>>,
{
    for line in lines {
        if token.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
        let line = line?;
        match filter_key(&line) {
            Some(key) if !words.contains(key) => emit(out, &line)?,
            _ => {}
        }
    }
    Ok(Outcome::Completed(()))
}

/// Count the words in tagger output lines.
fn tally<I>(lines: I, token: &CancellationToken) -> Result<Outcome<WordStats>>
where
    I: Iterator<Item = Result<String>>,
{
    let mut stats = WordStats::new();
    for line in lines {
        if token.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
        if let Some(word) = tagged_word(&line?) {
            stats.add(word);
        }
    }
    Ok(Outcome::Completed(stats))
}

fn count_sort(
    tagger: &TaggerCommand,
    with_stats: bool,
    out: &mut dyn Write,
    token: &CancellationToken,
) -> Result<Outcome<()>> {
    let mut process = tagger.spawn()?;
    let stats = match tally(&mut process, token) {
        Ok(Outcome::Completed(stats)) => {
            process.finish()?;
            stats
        }
        Ok(Outcome::Cancelled) => {
            process.abort();
            return Ok(Outcome::Cancelled);
        }
        Err(e) => {
            process.abort();
            return Err(e);
        }
    };

    debug!(distinct = stats.len(), "tagger output counted");
    for (rank, stat) in stats.ranked().into_iter().enumerate() {
        if with_stats {
            writeln!(out, "{} {} {}", rank + 1, stat.word, stat.occurrences)
                .map_err(|e| SieveError::io("failed to write snapshot", e))?;
        } else {
            emit(out, &stat.word)?;
        }
    }
    Ok(Outcome::Completed(()))
}
