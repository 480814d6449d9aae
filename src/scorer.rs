//! Log-probability scoring of character sequences.
//!
//! The HMM segmenter only needs one capability from a language model: a log10 score
//! for a whitespace-joined character sequence, with switches for the implicit
//! sentence-start and sentence-end markers.  [`Scorer`] captures that interface so any
//! model can be plugged in.  [`CharNgramModel`] is a small self-contained character
//! n-gram model that satisfies it and can be trained from corpus runs.

use std::path::Path;
use std::sync::Arc;

use log::info;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WensegError};
use crate::serialization::{read_bincode, write_bincode_atomic};

/// Marker token prepended when scoring with `bos`.
pub const BOS: &str = "<s>";
/// Marker token appended when scoring with `eos`.
pub const EOS: &str = "</s>";

/// Source of log10 probabilities for whitespace-separated token sequences.
pub trait Scorer {
    /// Returns the log10 probability of `sequence`.
    ///
    /// `bos` conditions the first token on the start marker; `eos` additionally scores the
    /// end marker after the last token.  An empty sequence without `eos` scores `0.0`.
    fn score(&self, sequence: &str, bos: bool, eos: bool) -> f64;
}

impl<T: Scorer + ?Sized> Scorer for &T {
    fn score(&self, sequence: &str, bos: bool, eos: bool) -> f64 {
        (**self).score(sequence, bos, eos)
    }
}

impl<T: Scorer + ?Sized> Scorer for Box<T> {
    fn score(&self, sequence: &str, bos: bool, eos: bool) -> f64 {
        (**self).score(sequence, bos, eos)
    }
}

impl<T: Scorer + ?Sized> Scorer for Arc<T> {
    fn score(&self, sequence: &str, bos: bool, eos: bool) -> f64 {
        (**self).score(sequence, bos, eos)
    }
}

/// Joins the characters of `text` with single spaces, the token layout scorers expect.
#[must_use]
pub fn spaced_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    for (idx, ch) in text.chars().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

/// Character n-gram model with add-one smoothing and longest-seen-context backoff.
///
/// Each token is predicted from the longest history suffix (at most `order - 1` tokens)
/// that occurred as a context during training:
/// `P(w | h) = (count(h w) + 1) / (count(h) + V)`, where `V` counts the predicted
/// vocabulary plus one slot for unseen tokens.  Scores are therefore always finite.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CharNgramModel {
    order: usize,
    ngrams: FxHashMap<String, u64>,
    contexts: FxHashMap<String, u64>,
    vocab_size: u64,
}

impl CharNgramModel {
    /// Trains a model of the given order over corpus runs.
    ///
    /// Every run is framed by [`BOS`] and [`EOS`]; characters are the tokens.
    pub fn train<S: AsRef<str>>(runs: &[S], order: usize) -> Result<Self> {
        if order == 0 {
            return Err(WensegError::InvalidConfig(
                "n-gram order must be at least 1".into(),
            ));
        }
        let mut ngrams: FxHashMap<String, u64> = FxHashMap::default();
        let mut contexts: FxHashMap<String, u64> = FxHashMap::default();
        let mut vocab: FxHashSet<String> = FxHashSet::default();

        for run in runs {
            let run = run.as_ref();
            if run.is_empty() {
                continue;
            }
            let mut tokens: Vec<String> = Vec::with_capacity(run.chars().count() + 2);
            tokens.push(BOS.to_string());
            tokens.extend(run.chars().map(String::from));
            tokens.push(EOS.to_string());

            for pos in 1..tokens.len() {
                vocab.insert(tokens[pos].clone());
                for len in 1..=order.min(pos + 1) {
                    let start = pos + 1 - len;
                    *contexts.entry(tokens[start..pos].join(" ")).or_insert(0) += 1;
                    *ngrams.entry(tokens[start..=pos].join(" ")).or_insert(0) += 1;
                }
            }
        }

        info!(
            "trained {order}-gram model: {} n-grams, {} contexts, {} token types",
            ngrams.len(),
            contexts.len(),
            vocab.len()
        );
        Ok(Self {
            order,
            ngrams,
            contexts,
            vocab_size: vocab.len() as u64 + 1,
        })
    }

    /// Model order.
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of distinct n-grams of every length.
    #[must_use]
    pub fn ngram_count(&self) -> usize {
        self.ngrams.len()
    }

    /// Size of the smoothing vocabulary, unseen-token slot included.
    #[must_use]
    pub fn vocab_size(&self) -> u64 {
        self.vocab_size
    }

    /// Raw training count of a space-joined n-gram.
    #[must_use]
    pub fn count(&self, ngram: &str) -> u64 {
        self.ngrams.get(ngram).copied().unwrap_or(0)
    }

    /// Log10 probability of `token` following `history`.
    #[must_use]
    pub fn log10_prob(&self, history: &[&str], token: &str) -> f64 {
        let max_context = self.order.saturating_sub(1).min(history.len());
        let vocab = self.vocab_size.max(1) as f64;
        for len in (0..=max_context).rev() {
            let context = history[history.len() - len..].join(" ");
            let Some(&context_count) = self.contexts.get(&context) else {
                continue;
            };
            let key = if context.is_empty() {
                token.to_string()
            } else {
                format!("{context} {token}")
            };
            let joint = self.count(&key) as f64;
            return ((joint + 1.0) / (context_count as f64 + vocab)).log10();
        }
        (1.0 / vocab).log10()
    }

    /// Writes the model to `path` in bincode form.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_bincode_atomic(self, path)
    }

    /// Loads a model written by [`CharNgramModel::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let model: Self = read_bincode(path)?;
        if model.order == 0 {
            return Err(WensegError::Serialization(
                "n-gram model has order 0".into(),
            ));
        }
        Ok(model)
    }
}

impl Scorer for CharNgramModel {
    fn score(&self, sequence: &str, bos: bool, eos: bool) -> f64 {
        let mut history: Vec<&str> = Vec::new();
        if bos {
            history.push(BOS);
        }
        let mut total = 0.0;
        for token in sequence.split_whitespace() {
            total += self.log10_prob(&history, token);
            history.push(token);
        }
        if eos {
            total += self.log10_prob(&history, EOS);
        }
        total
    }
}
