//! Word frequency accumulation and ranking.
//!
//! Counts are kept in first-seen order next to a hash index, so `add` is
//! O(1) amortized and ranking is a stable sort on the insertion-ordered list:
//! equal counts keep the order in which their words first appeared.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordStat {
    pub word: String,
    pub occurrences: u64,
}

#[derive(Debug, Default)]
pub struct WordStats {
    index: HashMap<String, usize>,
    entries: Vec<WordStat>,
}

impl WordStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, word: &str) {
        match self.index.get(word) {
            Some(&slot) => self.entries[slot].occurrences += 1,
            None => {
                self.index.insert(word.to_string(), self.entries.len());
                self.entries.push(WordStat {
                    word: word.to_string(),
                    occurrences: 1,
                });
            }
        }
    }

    /// Number of distinct words seen.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Consume the table, returning stats by descending occurrences.
    pub fn ranked(self) -> Vec<WordStat> {
        let mut ranked = self.entries;
        // sort_by_key is stable
        ranked.sort_by_key(|stat| std::cmp::Reverse(stat.occurrences));
        ranked
    }
}
