//! PMI and boundary-entropy lexicon construction.
//!
//! Construction runs in three phases:
//!
//! 1. **Build** – every substring of up to `max_word_len + 1` characters is counted in a
//!    forward trie, and its reversal in a mirrored trie.  Runs are split into shards that
//!    are built in parallel and merged by summing counts.
//! 2. **Compute** – each candidate of up to `max_word_len` characters receives its minimum
//!    split PMI and its right/left boundary entropies.
//! 3. **Filter** – candidates clearing every threshold and free of stopchars are kept.

pub mod entry;
pub mod trie;

use std::path::Path;
use std::time::Instant;

use log::info;
use rayon::prelude::*;

use crate::config::{IngestConfig, LexiconBuilder, LexiconConfig};
use crate::corpus::load_corpus;
use crate::error::{Result, WensegError};
use crate::metrics::{sample_rss_kb, ConstructionMetrics};

pub use entry::{Lexicon, LexiconEntry};
pub use trie::{NodeId, Trie, TrieNode};

/// Forward and reversed tries counted over the same corpus.
#[derive(Debug, Clone, Default)]
pub struct TriePair {
    /// Trie of substrings in reading order.
    pub forward: Trie,
    /// Trie of the same substrings with their characters reversed.
    pub reversed: Trie,
    /// Number of insertions performed on the forward trie.
    pub total: u64,
}

impl TriePair {
    /// Creates empty tries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts every substring of `run` up to `max_len` characters.
    pub fn add_run(&mut self, run: &str, max_len: usize) {
        let chars: Vec<char> = run.chars().collect();
        for start in 0..chars.len() {
            let end = (start + max_len).min(chars.len());
            self.total += self.forward.insert_prefixes(chars[start..end].iter().copied());
        }
        // Reversed windows are enumerated by their last character, walking leftwards.
        for last in 0..chars.len() {
            let first = (last + 1).saturating_sub(max_len);
            self.reversed
                .insert_prefixes(chars[first..=last].iter().rev().copied());
        }
    }

    /// Combines two independently built pairs.
    #[must_use]
    pub fn merge(mut self, mut other: Self) -> Self {
        if self.forward.len() < other.forward.len() {
            std::mem::swap(&mut self, &mut other);
        }
        self.forward.merge(&other.forward);
        self.reversed.merge(&other.reversed);
        self.total += other.total;
        self
    }
}

/// Candidate node paired with the surface string of its path.
#[derive(Debug, Clone)]
struct Candidate {
    node: NodeId,
    word: String,
}

#[derive(Debug, Clone, Copy)]
struct Scores {
    pmi: f64,
    r_entropy: f64,
    l_entropy: f64,
}

/// High-level façade configuring and executing lexicon construction runs.
#[derive(Debug, Clone)]
pub struct LexiconConstructor {
    cfg: LexiconConfig,
}

/// Artifacts returned after a construction session completes.
#[must_use]
#[derive(Debug, Clone)]
pub struct LexiconArtifacts {
    /// Accepted words, sorted for review.
    pub lexicon: Lexicon,
    /// Scored tries, kept for inspection.
    pub tries: TriePair,
    /// Timing and size metrics.
    pub metrics: ConstructionMetrics,
}

impl LexiconConstructor {
    /// Creates a constructor for the supplied configuration.
    #[must_use]
    pub fn new(cfg: LexiconConfig) -> Self {
        Self { cfg }
    }

    /// Returns a [`LexiconBuilder`] with default settings.
    #[must_use]
    pub fn builder() -> LexiconBuilder {
        LexiconConfig::builder()
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &LexiconConfig {
        &self.cfg
    }

    /// Loads Han runs from disk according to [`IngestConfig`] and constructs a lexicon.
    pub fn construct_from_paths<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        ingest: &IngestConfig,
    ) -> Result<LexiconArtifacts> {
        let runs = load_corpus(inputs, ingest)?;
        self.construct_lexicon(&runs)
    }

    /// Constructs a lexicon from cleaned Han runs.
    pub fn construct_lexicon<S>(&self, runs: &[S]) -> Result<LexiconArtifacts>
    where
        S: AsRef<str> + Sync,
    {
        self.cfg.validate()?;
        let session_start = Instant::now();
        let mut metrics = ConstructionMetrics {
            runs: runs.len(),
            ..ConstructionMetrics::default()
        };

        let phase_start = Instant::now();
        let (mut tries, shards) = self.build_tries(runs);
        metrics.build_duration = phase_start.elapsed();
        metrics.shards = shards;
        metrics.total_segments = tries.total;
        metrics.trie_nodes = tries.forward.len();
        metrics.reversed_trie_nodes = tries.reversed.len();
        metrics.rss_kb = sample_rss_kb();
        if self.cfg.show_progress {
            info!(
                "built tries over {} runs in {:.2?}: {} segments, {} nodes ({} reversed), {} shards",
                runs.len(),
                metrics.build_duration,
                tries.total,
                tries.forward.len(),
                tries.reversed.len(),
                shards
            );
        }

        let phase_start = Instant::now();
        let candidates = self.compute(&mut tries)?;
        metrics.compute_duration = phase_start.elapsed();
        metrics.candidates_scored = candidates.len();
        if self.cfg.show_progress {
            info!(
                "scored {} candidates in {:.2?}",
                candidates.len(),
                metrics.compute_duration
            );
        }

        let phase_start = Instant::now();
        let mut lexicon = self.filter(&tries, &candidates);
        lexicon.sort_for_review();
        metrics.filter_duration = phase_start.elapsed();
        metrics.accepted = lexicon.len();
        metrics.total_duration = session_start.elapsed();
        if self.cfg.show_progress {
            info!(
                "accepted {} of {} candidates; total {:.2?}",
                lexicon.len(),
                candidates.len(),
                metrics.total_duration
            );
        }

        Ok(LexiconArtifacts {
            lexicon,
            tries,
            metrics,
        })
    }

    /// Counts substrings of every run into a fresh [`TriePair`], in parallel shards.
    ///
    /// Returns the merged pair together with the number of shards actually built, which
    /// can be below the configured count when runs do not divide evenly.
    pub fn build_tries<S>(&self, runs: &[S]) -> (TriePair, usize)
    where
        S: AsRef<str> + Sync,
    {
        let max_len = self.cfg.max_segment_len();
        let requested = self
            .cfg
            .shards
            .unwrap_or_else(rayon::current_num_threads)
            .clamp(1, runs.len().max(1));
        let shard_len = runs.len().div_ceil(requested).max(1);
        let shards = runs.len().div_ceil(shard_len);
        let tries = runs
            .par_chunks(shard_len)
            .map(|shard| {
                let mut local = TriePair::new();
                for run in shard {
                    local.add_run(run.as_ref(), max_len);
                }
                local
            })
            .reduce(TriePair::new, TriePair::merge);
        (tries, shards)
    }

    fn compute(&self, tries: &mut TriePair) -> Result<Vec<Candidate>> {
        let candidates = collect_candidates(&tries.forward, self.cfg.max_word_len);
        let shared: &TriePair = tries;
        let scores = candidates
            .par_iter()
            .map(|candidate| self.score(shared, candidate))
            .collect::<Result<Vec<Scores>>>()?;
        for (candidate, scores) in candidates.iter().zip(scores) {
            let node = tries.forward.node_mut(candidate.node);
            node.pmi = scores.pmi;
            node.r_entropy = scores.r_entropy;
            node.l_entropy = scores.l_entropy;
        }
        Ok(candidates)
    }

    fn score(&self, tries: &TriePair, candidate: &Candidate) -> Result<Scores> {
        let chars: Vec<char> = candidate.word.chars().collect();
        let node = tries.forward.node(candidate.node);
        let pmi = if chars.len() == 1 {
            self.cfg.pmi_ceiling
        } else {
            let joint = node.freq as f64 * tries.total as f64;
            let mut pmi = f64::INFINITY;
            for split in 1..chars.len() {
                let left = tries.forward.frequency(chars[..split].iter().copied());
                let right = tries.forward.frequency(chars[split..].iter().copied());
                if left == 0 || right == 0 {
                    return Err(WensegError::Internal(format!(
                        "split {split} of {:?} missing from trie",
                        candidate.word
                    )));
                }
                pmi = pmi.min(joint / (left as f64 * right as f64));
            }
            pmi.min(self.cfg.pmi_ceiling)
        };
        let r_entropy = tries.forward.extension_entropy(candidate.node);
        let reversed = tries
            .reversed
            .find(chars.iter().rev().copied())
            .ok_or_else(|| {
                WensegError::Internal(format!(
                    "{:?} missing from reversed trie",
                    candidate.word
                ))
            })?;
        let l_entropy = tries.reversed.extension_entropy(reversed);
        Ok(Scores {
            pmi,
            r_entropy,
            l_entropy,
        })
    }

    fn filter(&self, tries: &TriePair, candidates: &[Candidate]) -> Lexicon {
        let stopchars = self.cfg.stopchar_set();
        candidates
            .iter()
            .filter_map(|candidate| {
                let node = tries.forward.node(candidate.node);
                let len = candidate.word.chars().count();
                let accepted = (1..=self.cfg.max_word_len).contains(&len)
                    && node.freq >= self.cfg.min_frequency
                    && node.pmi >= self.cfg.min_pmi
                    && node.r_entropy >= self.cfg.min_entropy
                    && node.l_entropy >= self.cfg.min_entropy
                    && (len == 1 || !stopchars.any_in(&candidate.word));
                accepted.then(|| LexiconEntry {
                    word: candidate.word.clone(),
                    frequency: node.freq,
                    pmi: node.pmi,
                    r_entropy: node.r_entropy,
                    l_entropy: node.l_entropy,
                })
            })
            .collect()
    }
}

/// Enumerates every forward-trie path of `1..=max_len` characters.
fn collect_candidates(trie: &Trie, max_len: usize) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let mut stack = vec![(Trie::ROOT, String::new(), 0usize)];
    while let Some((node, word, depth)) = stack.pop() {
        if depth == max_len {
            continue;
        }
        for (ch, child) in trie.children(node) {
            let mut extended = word.clone();
            extended.push(ch);
            candidates.push(Candidate {
                node: child,
                word: extended.clone(),
            });
            stack.push((child, extended, depth + 1));
        }
    }
    candidates
}
