//! wordsieve — turn a corpus into a ranked, filtered word list.
//!
//! A working document passes through a chain of transformations, each one
//! producing an immutable snapshot file:
//!
//! 1. **strip** — drop the translations of a `word<TAB>translation` deck
//! 2. **count-stats** / **count** — run the language's tagger over the
//!    document and rank the tagged words by frequency
//! 3. **filter** — remove stop words listed in the language's word list
//!
//! Snapshots form a linear history that can be undone step by step, and any
//! operation can be cancelled at a line boundary without touching history.

pub mod cancel;
pub mod config;
pub mod error;
pub mod language;
pub mod session;
pub mod snapshot;
pub mod stats;
pub mod tagger;
pub mod transform;

pub use crate::error::{Outcome, SieveError};
pub use crate::language::Language;
pub use crate::session::Session;
pub use crate::transform::Operation;
