//! Accepted lexicon entries and their review ordering.

use std::cmp::Ordering;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::serialization;

/// One accepted word candidate with the statistics that admitted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconEntry {
    /// Surface form.
    #[serde(rename = "Word")]
    pub word: String,
    /// Number of occurrences in the corpus.
    #[serde(rename = "Frequency")]
    pub frequency: u64,
    /// Minimum split PMI.
    #[serde(rename = "PMI")]
    pub pmi: f64,
    /// Entropy of the right-neighbour distribution.
    #[serde(rename = "R_Entropy")]
    pub r_entropy: f64,
    /// Entropy of the left-neighbour distribution.
    #[serde(rename = "L_Entropy")]
    pub l_entropy: f64,
}

impl LexiconEntry {
    /// Length of the word in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.word.chars().count()
    }

    /// Review order: shorter words first, then higher frequency, PMI, right and left entropy.
    ///
    /// The word itself breaks any remaining tie so the order is total.
    #[must_use]
    pub fn review_cmp(&self, other: &Self) -> Ordering {
        self.char_len()
            .cmp(&other.char_len())
            .then_with(|| other.frequency.cmp(&self.frequency))
            .then_with(|| other.pmi.total_cmp(&self.pmi))
            .then_with(|| other.r_entropy.total_cmp(&self.r_entropy))
            .then_with(|| other.l_entropy.total_cmp(&self.l_entropy))
            .then_with(|| self.word.cmp(&other.word))
    }
}

/// Collection of accepted candidates produced by lexicon construction.
#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lexicon {
    entries: Vec<LexiconEntry>,
}

impl Lexicon {
    /// Wraps a list of entries without reordering them.
    pub fn new(entries: Vec<LexiconEntry>) -> Self {
        Self { entries }
    }

    /// Number of accepted words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing was accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in their current order.
    #[must_use]
    pub fn entries(&self) -> &[LexiconEntry] {
        &self.entries
    }

    /// Iterates entries in their current order.
    pub fn iter(&self) -> impl Iterator<Item = &LexiconEntry> {
        self.entries.iter()
    }

    /// Finds the entry for `word`.
    #[must_use]
    pub fn get(&self, word: &str) -> Option<&LexiconEntry> {
        self.entries.iter().find(|entry| entry.word == word)
    }

    /// Returns `true` if `word` was accepted.
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.get(word).is_some()
    }

    /// Reorders entries for human review (see [`LexiconEntry::review_cmp`]).
    pub fn sort_for_review(&mut self) {
        self.entries.sort_by(LexiconEntry::review_cmp);
    }

    /// Consumes the lexicon, returning its entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<LexiconEntry> {
        self.entries
    }

    /// Writes the lexicon as CSV with the `Word,Frequency,PMI,R_Entropy,L_Entropy` header.
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        serialization::save_lexicon_csv(self, path)
    }
}

impl FromIterator<LexiconEntry> for Lexicon {
    fn from_iter<I: IntoIterator<Item = LexiconEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Lexicon {
    type Item = &'a LexiconEntry;
    type IntoIter = std::slice::Iter<'a, LexiconEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(word: &str, frequency: u64, pmi: f64) -> LexiconEntry {
        LexiconEntry {
            word: word.into(),
            frequency,
            pmi,
            r_entropy: 2.5,
            l_entropy: 2.5,
        }
    }

    #[test]
    fn review_order_puts_short_frequent_words_first() {
        let mut lexicon: Lexicon = vec![
            entry("天下", 40, 120.0),
            entry("道", 12, 80.0),
            entry("圣人", 40, 300.0),
            entry("天", 90, 80.0),
            entry("百姓", 15, 500.0),
        ]
        .into_iter()
        .collect();
        lexicon.sort_for_review();
        let words: Vec<&str> = lexicon.iter().map(|e| e.word.as_str()).collect();
        assert_eq!(words, vec!["天", "道", "圣人", "天下", "百姓"]);
    }

    #[test]
    fn lookup_by_word() {
        let lexicon = Lexicon::new(vec![entry("大道", 15, 100.0)]);
        assert!(lexicon.contains("大道"));
        assert_eq!(lexicon.get("大道").map(|e| e.frequency), Some(15));
        assert!(lexicon.get("之大").is_none());
    }
}
