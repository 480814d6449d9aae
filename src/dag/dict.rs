use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WensegError};
use crate::serialization::{load_snapshot, save_snapshot};

/// Word weights plus zero-weight entries for every proper prefix of every word.
///
/// A weight of `0` marks a string that is only known as the beginning of a longer word.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefixDict {
    weights: FxHashMap<String, u64>,
    total: u64,
}

impl PrefixDict {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dictionary from `(word, weight)` pairs.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        let mut dict = Self::new();
        for (word, weight) in entries {
            dict.insert(word.as_ref(), weight);
        }
        dict
    }

    /// Sets the weight of `word` and registers its proper prefixes.
    ///
    /// Re-inserting a word replaces its weight; the total is adjusted accordingly.
    pub fn insert(&mut self, word: &str, weight: u64) {
        if word.is_empty() {
            return;
        }
        let previous = self.weights.insert(word.to_string(), weight).unwrap_or(0);
        self.total = self.total - previous + weight;
        for (idx, _) in word.char_indices().skip(1) {
            self.weights.entry(word[..idx].to_string()).or_insert(0);
        }
    }

    /// Parses `word,weight` lines.
    ///
    /// Rows with a missing or non-integer weight, an empty word, or invalid UTF-8 are
    /// skipped; read failures are returned.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = ::csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(::csv::Trim::All)
            .from_reader(reader);
        let mut dict = Self::new();
        let mut skipped = 0usize;
        for (line, record) in csv_reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    debug!("skipping dictionary row {}: {err}", line + 1);
                    skipped += 1;
                    continue;
                }
            };
            let word = record.get(0).unwrap_or_default();
            match record.get(1).map(str::parse::<u64>) {
                Some(Ok(weight)) if !word.is_empty() => dict.insert(word, weight),
                _ => {
                    debug!("skipping malformed dictionary row {}", line + 1);
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            warn!("skipped {skipped} malformed dictionary rows");
        }
        Ok(dict)
    }

    /// Loads a dictionary file; a missing file is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| WensegError::io(err, Some(path.to_path_buf())))?;
        let dict = Self::from_reader(BufReader::new(file))?;
        info!(
            "loaded dictionary {} ({} entries, total weight {})",
            path.display(),
            dict.len(),
            dict.total
        );
        Ok(dict)
    }

    /// Loads `dict`, reusing the binary snapshot at `cache` when it was built from the
    /// current version of the file.
    ///
    /// A stale or unreadable snapshot is rebuilt.  Failing to write the snapshot is only
    /// logged, since the dictionary itself loaded fine.
    pub fn load_cached<P: AsRef<Path>, Q: AsRef<Path>>(dict: P, cache: Q) -> Result<Self> {
        let (dict, cache) = (dict.as_ref(), cache.as_ref());
        if let Some(snapshot) = load_snapshot::<Self, _, _>(dict, cache)? {
            debug!("dictionary loaded from cache {}", cache.display());
            return Ok(snapshot);
        }
        let loaded = Self::load(dict)?;
        if let Err(err) = save_snapshot(&loaded, dict, cache) {
            warn!("could not write dictionary cache {}: {err}", cache.display());
        }
        Ok(loaded)
    }

    /// Weight of `word`, or `None` when it is neither a word nor a prefix.
    #[must_use]
    pub fn get(&self, word: &str) -> Option<u64> {
        self.weights.get(word).copied()
    }

    /// Weight of `word`, `0` for prefixes and unknown strings.
    #[must_use]
    pub fn weight(&self, word: &str) -> u64 {
        self.get(word).unwrap_or(0)
    }

    /// Returns `true` when `word` has a positive weight.
    #[must_use]
    pub fn is_word(&self, word: &str) -> bool {
        self.weight(word) > 0
    }

    /// Returns `true` when `text` is a word or a prefix of one.
    #[must_use]
    pub fn contains_prefix(&self, text: &str) -> bool {
        self.weights.contains_key(text)
    }

    /// Sum of all word weights.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of entries, prefixes included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Returns `true` when nothing was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn prefixes_get_zero_weight() {
        let dict = PrefixDict::from_entries([("天下为公", 5u64), ("天", 30)]);
        assert_eq!(dict.get("天下"), Some(0));
        assert_eq!(dict.get("天下为"), Some(0));
        assert_eq!(dict.get("天"), Some(30));
        assert!(dict.contains_prefix("天下"));
        assert!(!dict.is_word("天下"));
        assert!(dict.get("下").is_none());
        assert_eq!(dict.total(), 35);
    }

    #[test]
    fn later_word_overrides_prefix_entry() {
        let dict = PrefixDict::from_entries([("天下为公", 5u64), ("天下", 50), ("天下", 40)]);
        assert_eq!(dict.weight("天下"), 40);
        assert_eq!(dict.total(), 45);
    }

    #[test]
    fn reader_skips_malformed_rows() {
        let text = "word,frequency\n天下,50\n天,30\n坏行\n下,abc\n,7\n下, 20 \n";
        let dict = PrefixDict::from_reader(text.as_bytes()).expect("parse");
        assert_eq!(dict.weight("天下"), 50);
        assert_eq!(dict.weight("下"), 20);
        assert!(dict.get("word").is_none());
        assert!(dict.get("坏行").is_none());
        assert_eq!(dict.total(), 100);
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempdir().expect("tempdir");
        assert!(PrefixDict::load(dir.path().join("absent.txt")).is_err());
        assert!(
            PrefixDict::load_cached(dir.path().join("absent.txt"), dir.path().join("c.bin"))
                .is_err()
        );
    }

    #[test]
    fn cache_is_reused_and_refreshed() {
        let dir = tempdir().expect("tempdir");
        let source = dir.path().join("dict.txt");
        let cache = dir.path().join("dict.cache");
        fs::write(&source, "天下,50\n天,30\n下,20\n").expect("write dict");

        let first = PrefixDict::load_cached(&source, &cache).expect("first load");
        assert!(cache.is_file());
        let second = PrefixDict::load_cached(&source, &cache).expect("cached load");
        assert_eq!(first, second);

        fs::write(&source, "天下,50\n天,30\n下,20\n大道,15\n").expect("rewrite dict");
        let third = PrefixDict::load_cached(&source, &cache).expect("reload");
        assert_eq!(third.weight("大道"), 15);
        assert_eq!(third.total(), 115);
    }
}
