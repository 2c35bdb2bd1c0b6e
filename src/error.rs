//! Error taxonomy and the cancellation-aware outcome type.
//!
//! A user cancel is not an error: operations return
//! `Result<Outcome<T>, SieveError>` so callers can never confuse the two.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Faults surfaced by the sieve core.
#[derive(Debug, Error)]
pub enum SieveError {
    /// Missing language, filter or tagger binding, or an unusable snapshot directory.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The tagger command line is built by plain concatenation and cannot quote spaces.
    #[error("cannot process files that have spaces in their path: {}", .0.display())]
    PathFormat(PathBuf),

    #[error("could not recognize the operating system: {0}")]
    UnsupportedPlatform(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The background task running an operation panicked or was aborted.
    #[error("background worker failed: {0}")]
    Worker(String),
}

impl SieveError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        SieveError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, SieveError::Configuration(_))
    }
}

pub type Result<T, E = SieveError> = std::result::Result<T, E>;

/// How a cancellable step ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Cancelled => None,
        }
    }
}
