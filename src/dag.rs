//! Maximum-likelihood segmentation against a weighted prefix dictionary.
//!
//! For each Han run the segmenter builds a [`Dag`] of every dictionary word that starts
//! at each character, then walks the graph backwards keeping, per position, the best
//! log-probability of the remaining suffix.  Word probabilities are Laplace smoothed:
//! a span without a positive weight counts as weight 1.

mod dict;

pub use dict::PrefixDict;

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use crate::charset::{char_slices, chunks, Chunk, Chunks};
use crate::error::Result;

/// One step of the route table: best suffix log-probability and the inclusive end of the
/// first word on that suffix.
pub type RouteStep = (f64, usize);

/// Word-end candidates for every character of a sentence.
///
/// Positions are character indices; `ends(i)` is sorted ascending and never empty.
#[derive(Debug, Clone)]
pub struct Dag<'a> {
    sentence: &'a str,
    offsets: Vec<usize>,
    ends: Vec<Vec<usize>>,
}

impl<'a> Dag<'a> {
    /// Builds the graph by extending each start while the span stays a known prefix.
    #[must_use]
    pub fn build(dict: &PrefixDict, sentence: &'a str) -> Self {
        let offsets: Vec<usize> = sentence.char_indices().map(|(idx, _)| idx).collect();
        let n = offsets.len();
        let mut ends = Vec::with_capacity(n);
        for start in 0..n {
            let mut reachable = Vec::new();
            let mut end = start;
            while end < n {
                let fragment = &sentence[offsets[start]..byte_end(&offsets, sentence, end)];
                match dict.get(fragment) {
                    Some(weight) => {
                        if weight > 0 {
                            reachable.push(end);
                        }
                        end += 1;
                    }
                    None => break,
                }
            }
            if reachable.is_empty() {
                reachable.push(start);
            }
            ends.push(reachable);
        }
        Self {
            sentence,
            offsets,
            ends,
        }
    }

    /// Number of characters in the sentence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Returns `true` for an empty sentence.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Reachable inclusive end indices from `start`.
    #[must_use]
    pub fn ends(&self, start: usize) -> &[usize] {
        &self.ends[start]
    }

    /// The text of characters `start..=end`.
    #[must_use]
    pub fn span(&self, start: usize, end: usize) -> &'a str {
        &self.sentence[self.offsets[start]..byte_end(&self.offsets, self.sentence, end)]
    }

    /// Computes the route table of size `len() + 1` by backward dynamic programming.
    ///
    /// Ends are tried in ascending order and a later end replaces the incumbent on an
    /// equal score, so ties resolve to the longer word.
    #[must_use]
    pub fn route(&self, dict: &PrefixDict) -> Vec<RouteStep> {
        let n = self.len();
        let log_total = (dict.total().max(1) as f64).ln();
        let mut route: Vec<RouteStep> = vec![(0.0, 0); n + 1];
        for start in (0..n).rev() {
            let mut best: RouteStep = (f64::NEG_INFINITY, start);
            for &end in &self.ends[start] {
                let weight = dict.weight(self.span(start, end)).max(1);
                let score = (weight as f64).ln() - log_total + route[end + 1].0;
                if score >= best.0 {
                    best = (score, end);
                }
            }
            route[start] = best;
        }
        route
    }

    /// Follows `route` forward from position 0, returning the chosen words.
    #[must_use]
    pub fn words(&self, route: &[RouteStep]) -> Vec<&'a str> {
        let mut words = Vec::with_capacity(self.len() / 2 + 1);
        let mut start = 0;
        while start < self.len() {
            let end = route[start].1;
            words.push(self.span(start, end));
            start = end + 1;
        }
        words
    }
}

fn byte_end(offsets: &[usize], sentence: &str, end: usize) -> usize {
    offsets.get(end + 1).copied().unwrap_or(sentence.len())
}

/// Dictionary-driven segmenter.  Cloning shares the dictionary.
#[derive(Debug, Clone)]
pub struct DagSegmenter {
    dict: Arc<PrefixDict>,
}

impl DagSegmenter {
    /// Wraps a loaded dictionary.
    pub fn new(dict: impl Into<Arc<PrefixDict>>) -> Self {
        Self { dict: dict.into() }
    }

    /// Loads the dictionary at `path`, through the snapshot at `cache` when given.
    pub fn from_dict_file<P, Q>(path: P, cache: Option<Q>) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let dict = match cache {
            Some(cache) => PrefixDict::load_cached(path, cache)?,
            None => PrefixDict::load(path)?,
        };
        Ok(Self::new(dict))
    }

    /// The shared dictionary.
    #[must_use]
    pub fn dict(&self) -> &PrefixDict {
        &self.dict
    }

    /// Segments one Han run into its highest-probability word sequence.
    #[must_use]
    pub fn cut_run<'a>(&self, run: &'a str) -> Vec<&'a str> {
        let dag = Dag::build(&self.dict, run);
        let route = dag.route(&self.dict);
        dag.words(&route)
    }

    /// Route table for `run`; `route(run)[0].0` is the score of the best segmentation.
    #[must_use]
    pub fn route(&self, run: &str) -> Vec<RouteStep> {
        Dag::build(&self.dict, run).route(&self.dict)
    }

    /// Smoothed log-probability of a given segmentation.
    #[must_use]
    pub fn path_score<S: AsRef<str>>(&self, words: &[S]) -> f64 {
        let log_total = (self.dict.total().max(1) as f64).ln();
        words
            .iter()
            .map(|word| (self.dict.weight(word.as_ref()).max(1) as f64).ln() - log_total)
            .sum()
    }

    /// Lazily segments `text`; non-Han characters come out one per token.
    pub fn tokenize<'a>(&'a self, text: &'a str) -> DagTokens<'a> {
        DagTokens {
            segmenter: self,
            chunks: chunks(text),
            pending: VecDeque::new(),
        }
    }

    /// Eagerly segments `text`.
    #[must_use]
    pub fn cut<'a>(&'a self, text: &'a str) -> Vec<&'a str> {
        self.tokenize(text).collect()
    }
}

/// Iterator returned by [`DagSegmenter::tokenize`].
#[derive(Debug)]
pub struct DagTokens<'a> {
    segmenter: &'a DagSegmenter,
    chunks: Chunks<'a>,
    pending: VecDeque<&'a str>,
}

impl<'a> Iterator for DagTokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            match self.chunks.next()? {
                Chunk::Han(run) => self.pending.extend(self.segmenter.cut_run(run)),
                Chunk::Other(other) => self.pending.extend(char_slices(other)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter(entries: &[(&str, u64)]) -> DagSegmenter {
        DagSegmenter::new(PrefixDict::from_entries(entries.iter().copied()))
    }

    #[test]
    fn dominant_compound_wins() {
        let seg = segmenter(&[("天下", 50), ("天", 30), ("下", 20)]);
        assert_eq!(seg.cut("天下"), vec!["天下"]);
    }

    #[test]
    fn absent_compound_falls_back_to_singletons() {
        let seg = segmenter(&[("天", 30), ("下", 20)]);
        assert_eq!(seg.cut("天下"), vec!["天", "下"]);
    }

    #[test]
    fn dag_ends_follow_prefixes() {
        let dict = PrefixDict::from_entries([("天下为公", 5u64), ("天", 30), ("下", 20)]);
        let dag = Dag::build(&dict, "天下为公");
        assert_eq!(dag.ends(0), &[0, 3]);
        assert_eq!(dag.ends(1), &[1]);
        assert_eq!(dag.ends(2), &[2]);
        assert_eq!(dag.span(0, 3), "天下为公");
    }

    #[test]
    fn unknown_characters_are_singletons() {
        let seg = segmenter(&[("天下", 50)]);
        let dag = Dag::build(seg.dict(), "龘天下");
        assert_eq!(dag.ends(0), &[0]);
        assert_eq!(seg.cut("龘天下"), vec!["龘", "天下"]);
    }

    #[test]
    fn tokens_cover_the_input() {
        let seg = segmenter(&[("天下", 50), ("大道", 15), ("天", 30), ("下", 20)]);
        let text = "天下大道, 行也！abc天";
        let tokens = seg.cut(text);
        assert_eq!(tokens.concat(), text);
        assert!(tokens.contains(&"天下"));
        assert!(tokens.contains(&"大道"));
        assert!(tokens.contains(&" "));
        assert!(tokens
            .iter()
            .filter(|token| !token.chars().all(crate::charset::is_han))
            .all(|token| token.chars().count() == 1));
    }

    #[test]
    fn best_route_never_loses_to_singletons() {
        let seg = segmenter(&[
            ("天", 30),
            ("下", 20),
            ("大", 10),
            ("道", 12),
            ("天下", 50),
            ("下大", 3),
            ("大道", 15),
        ]);
        for run in ["天下大道", "大道天下", "下大天道", "天天下下"] {
            let route = seg.route(run);
            let singles: Vec<String> = run.chars().map(String::from).collect();
            assert!(route[0].0 >= seg.path_score(&singles) - 1e-9, "{run}");
            let words = seg.cut_run(run);
            assert!((seg.path_score(&words) - route[0].0).abs() < 1e-9);
            assert_eq!(words.concat(), run);
        }
    }

    #[test]
    fn empty_input_yields_nothing() {
        let seg = segmenter(&[("天", 1)]);
        assert!(seg.cut("").is_empty());
        assert_eq!(seg.route(""), vec![(0.0, 0)]);
    }
}
