//! Character-position HMM segmenter.
//!
//! Every character is tagged with its position inside a word (first, second, third, or
//! fourth-and-later) by Viterbi decoding.  The emission score of a state is the
//! conditional log10 probability the [`Scorer`] assigns to the character given the
//! preceding characters of the would-be word, so a state `k` characters into a word looks
//! at a window of `k` characters.  Transition probabilities are fixed and only allow a
//! word to continue one position deeper or a new word to begin.

use std::collections::VecDeque;
use std::fmt;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::charset::{char_slices, leading_chunk, strip_whitespace, Chunk, StopChars};
use crate::config::{HmmConfig, TransitionProbs};
use crate::error::Result;
use crate::scorer::{spaced_chars, Scorer};

/// Number of hidden states.
pub const STATE_COUNT: usize = 4;

/// Position of a character inside the word being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionState {
    /// Starts a word (`b`).
    WordInitial,
    /// Second character (`c`).
    Second,
    /// Third character (`d`).
    Third,
    /// Fourth or any later character (`e`).
    Fourth,
}

impl PositionState {
    /// States in decoding order; ties resolve to the earlier entry.
    pub const ALL: [PositionState; STATE_COUNT] = [
        PositionState::WordInitial,
        PositionState::Second,
        PositionState::Third,
        PositionState::Fourth,
    ];

    /// Dense index used by score tables.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            PositionState::WordInitial => 0,
            PositionState::Second => 1,
            PositionState::Third => 2,
            PositionState::Fourth => 3,
        }
    }

    /// Stable single-letter label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            PositionState::WordInitial => "b",
            PositionState::Second => "c",
            PositionState::Third => "d",
            PositionState::Fourth => "e",
        }
    }

    /// Parses a label produced by [`PositionState::label`].
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.label() == label)
    }

    /// Length of the character window whose conditional probability scores this state.
    #[must_use]
    pub fn window_len(self) -> usize {
        self.index() + 1
    }
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Log10 transition scores; `None` marks a forbidden transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionTable {
    scores: [[Option<f64>; STATE_COUNT]; STATE_COUNT],
}

impl TransitionTable {
    /// Converts linear probabilities into the log10 table.
    #[must_use]
    pub fn from_probs(probs: &TransitionProbs) -> Self {
        use PositionState::{Fourth, Second, Third, WordInitial};

        let mut scores = [[None; STATE_COUNT]; STATE_COUNT];
        let legal = [
            (WordInitial, WordInitial, probs.bb),
            (WordInitial, Second, probs.bc),
            (Second, WordInitial, probs.cb),
            (Second, Third, probs.cd),
            (Third, WordInitial, probs.db),
            (Third, Fourth, probs.de),
            (Fourth, WordInitial, probs.eb),
            (Fourth, Fourth, probs.ee),
        ];
        for (from, to, prob) in legal {
            scores[from.index()][to.index()] = Some(prob.log10());
        }
        Self { scores }
    }

    /// Log10 probability of moving from `from` to `to`, or `None` when forbidden.
    #[must_use]
    pub fn log_prob(&self, from: PositionState, to: PositionState) -> Option<f64> {
        self.scores[from.index()][to.index()]
    }

    /// Returns `true` when the transition is allowed.
    #[must_use]
    pub fn is_legal(&self, from: PositionState, to: PositionState) -> bool {
        self.log_prob(from, to).is_some()
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::from_probs(&TransitionProbs::default())
    }
}

/// Viterbi segmenter over a pluggable scorer.
#[derive(Debug, Clone)]
pub struct HmmSegmenter<S> {
    scorer: S,
    cfg: HmmConfig,
    transitions: TransitionTable,
    stopchars: StopChars,
}

impl<S: Scorer> HmmSegmenter<S> {
    /// Creates a segmenter with the default configuration.
    pub fn new(scorer: S) -> Self {
        let cfg = HmmConfig::default();
        Self {
            transitions: TransitionTable::from_probs(&cfg.transitions),
            stopchars: StopChars::new(cfg.stopchars.iter().copied()),
            scorer,
            cfg,
        }
    }

    /// Creates a segmenter after validating `cfg`.
    pub fn with_config(scorer: S, cfg: HmmConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            transitions: TransitionTable::from_probs(&cfg.transitions),
            stopchars: StopChars::new(cfg.stopchars.iter().copied()),
            scorer,
            cfg,
        })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &HmmConfig {
        &self.cfg
    }

    /// Transition table in log10 form.
    #[must_use]
    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    /// The underlying scorer.
    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Emission score of every state at every character of `run`.
    ///
    /// A window that would reach before the start of the run, or a scorer difference
    /// that is not finite, gets the configured emission floor.
    #[must_use]
    pub fn emissions(&self, run: &str) -> Vec<[f64; STATE_COUNT]> {
        let chars: Vec<char> = run.chars().collect();
        let floor = self.cfg.emission_floor;
        (0..chars.len())
            .map(|pos| {
                let mut row = [floor; STATE_COUNT];
                for state in PositionState::ALL {
                    let len = state.window_len();
                    if pos + 1 < len {
                        continue;
                    }
                    let window: String = chars[pos + 1 - len..=pos].iter().collect();
                    let context: String = chars[pos + 1 - len..pos].iter().collect();
                    let full = self.scorer.score(&spaced_chars(&window), false, false);
                    let head = self.scorer.score(&spaced_chars(&context), false, false);
                    let diff = full - head;
                    if diff.is_finite() {
                        row[state.index()] = diff;
                    }
                }
                row
            })
            .collect()
    }

    fn initial_score(&self, state: PositionState) -> f64 {
        match state {
            PositionState::WordInitial => 0.0,
            _ => self.cfg.unreachable_score,
        }
    }

    /// Most likely state sequence for `run`, one state per character.
    #[must_use]
    pub fn viterbi(&self, run: &str) -> Vec<PositionState> {
        let emissions = self.emissions(run);
        let Some(first) = emissions.first() else {
            return Vec::new();
        };

        let mut scores = [0.0; STATE_COUNT];
        for state in PositionState::ALL {
            scores[state.index()] = self.initial_score(state) + first[state.index()];
        }
        let mut back_pointers: Vec<[PositionState; STATE_COUNT]> =
            Vec::with_capacity(emissions.len().saturating_sub(1));

        for emission in &emissions[1..] {
            let mut next = [f64::NEG_INFINITY; STATE_COUNT];
            let mut from_states = [PositionState::WordInitial; STATE_COUNT];
            for to in PositionState::ALL {
                let mut best: Option<(f64, PositionState)> = None;
                for from in PositionState::ALL {
                    let Some(transition) = self.transitions.log_prob(from, to) else {
                        continue;
                    };
                    let candidate = scores[from.index()] + transition + emission[to.index()];
                    if best.map_or(true, |(score, _)| candidate > score) {
                        best = Some((candidate, from));
                    }
                }
                if let Some((score, from)) = best {
                    next[to.index()] = score;
                    from_states[to.index()] = from;
                }
            }
            scores = next;
            back_pointers.push(from_states);
        }

        let mut last = PositionState::WordInitial;
        for state in PositionState::ALL {
            if scores[state.index()] > scores[last.index()] {
                last = state;
            }
        }
        trace!("viterbi best score {} for {run}", scores[last.index()]);

        let mut states = Vec::with_capacity(emissions.len());
        states.push(last);
        for pointers in back_pointers.iter().rev() {
            last = pointers[last.index()];
            states.push(last);
        }
        states.reverse();
        states
    }

    /// Segments one Han run.
    ///
    /// A decoded word containing a stopchar is split back into its characters.
    #[must_use]
    pub fn cut_run(&self, run: &str) -> Vec<String> {
        let states = self.viterbi(run);
        let mut tokens = Vec::new();
        let mut word = String::new();
        for (ch, state) in run.chars().zip(states) {
            if state == PositionState::WordInitial && !word.is_empty() {
                self.flush_word(&mut word, &mut tokens);
            }
            word.push(ch);
        }
        if !word.is_empty() {
            self.flush_word(&mut word, &mut tokens);
        }
        tokens
    }

    fn flush_word(&self, word: &mut String, tokens: &mut Vec<String>) {
        if self.stopchars.any_in(word) {
            tokens.extend(word.chars().map(String::from));
            word.clear();
        } else {
            tokens.push(std::mem::take(word));
        }
    }

    /// Lazily segments `text` after removing whitespace; non-Han characters come out one
    /// per token.
    pub fn tokenize(&self, text: &str) -> HmmTokens<'_, S> {
        HmmTokens {
            segmenter: self,
            text: strip_whitespace(text),
            cursor: 0,
            pending: VecDeque::new(),
        }
    }

    /// Eagerly segments `text`.
    #[must_use]
    pub fn cut(&self, text: &str) -> Vec<String> {
        self.tokenize(text).collect()
    }
}

/// Iterator returned by [`HmmSegmenter::tokenize`].
#[derive(Debug)]
pub struct HmmTokens<'a, S> {
    segmenter: &'a HmmSegmenter<S>,
    text: String,
    cursor: usize,
    pending: VecDeque<String>,
}

impl<'a, S: Scorer> Iterator for HmmTokens<'a, S> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            let chunk = leading_chunk(&self.text[self.cursor..])?;
            self.cursor += chunk.as_str().len();
            match chunk {
                Chunk::Han(run) => self.pending.extend(self.segmenter.cut_run(run)),
                Chunk::Other(other) => self
                    .pending
                    .extend(char_slices(other).map(str::to_string)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every token costs 2.0; each adjacent pair listed in `bigrams` earns 1.9 back.
    struct PairScorer {
        bigrams: Vec<(char, char)>,
    }

    impl Scorer for PairScorer {
        fn score(&self, sequence: &str, _bos: bool, _eos: bool) -> f64 {
            let chars: Vec<char> = sequence
                .split_whitespace()
                .filter_map(|token| token.chars().next())
                .collect();
            let bonus = chars
                .windows(2)
                .filter(|pair| self.bigrams.contains(&(pair[0], pair[1])))
                .count() as f64;
            -2.0 * chars.len() as f64 + 1.9 * bonus
        }
    }

    fn segmenter(bigrams: &[(char, char)]) -> HmmSegmenter<PairScorer> {
        HmmSegmenter::new(PairScorer {
            bigrams: bigrams.to_vec(),
        })
    }

    #[test]
    fn transition_table_allows_only_forward_moves() {
        use PositionState::{Fourth, Second, Third, WordInitial};
        let table = TransitionTable::default();
        let legal = [
            (WordInitial, WordInitial),
            (WordInitial, Second),
            (Second, WordInitial),
            (Second, Third),
            (Third, WordInitial),
            (Third, Fourth),
            (Fourth, WordInitial),
            (Fourth, Fourth),
        ];
        for from in PositionState::ALL {
            for to in PositionState::ALL {
                assert_eq!(table.is_legal(from, to), legal.contains(&(from, to)), "{from}->{to}");
            }
        }
        let bb = table.log_prob(WordInitial, WordInitial).unwrap();
        assert!((bb - 0.85f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn emissions_use_floor_before_run_start() {
        let seg = segmenter(&[('天', '下')]);
        let emissions = seg.emissions("天下");
        assert_eq!(emissions.len(), 2);
        assert!((emissions[0][0] + 2.0).abs() < 1e-12);
        assert_eq!(emissions[0][1], -100.0);
        assert!((emissions[1][1] + 0.1).abs() < 1e-12);
        assert_eq!(emissions[1][2], -100.0);
        assert_eq!(emissions[1][3], -100.0);
    }

    #[test]
    fn known_bigrams_become_words() {
        let seg = segmenter(&[('天', '下')]);
        assert_eq!(seg.cut("天下天下"), vec!["天下", "天下"]);
    }

    #[test]
    fn decoded_paths_are_legal() {
        let seg = segmenter(&[('天', '天')]);
        for run in ["天天天天天", "天", "天下大道至简"] {
            let states = seg.viterbi(run);
            assert_eq!(states.len(), run.chars().count());
            assert_eq!(states[0], PositionState::WordInitial);
            for pair in states.windows(2) {
                assert!(seg.transitions().is_legal(pair[0], pair[1]), "{run}: {pair:?}");
            }
        }
    }

    #[test]
    fn stopchar_words_are_split() {
        let seg = segmenter(&[('之', '乎')]);
        assert_eq!(
            seg.viterbi("之乎"),
            vec![PositionState::WordInitial, PositionState::Second]
        );
        assert_eq!(seg.cut("之乎"), vec!["之", "乎"]);
    }

    #[test]
    fn tokens_cover_text_without_whitespace() {
        let seg = segmenter(&[('天', '下'), ('大', '道')]);
        let text = "天下 大道，行也！abc 天";
        let tokens = seg.cut(text);
        assert_eq!(tokens.concat(), strip_whitespace(text));
        assert!(tokens.iter().any(|t| t == "大道"));
        assert!(tokens.iter().any(|t| t == "，"));
        assert!(seg.cut("").is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = HmmConfig {
            emission_floor: 1.0,
            ..HmmConfig::default()
        };
        assert!(HmmSegmenter::with_config(PairScorer { bigrams: vec![] }, cfg).is_err());
    }

    #[test]
    fn state_labels_are_stable() {
        let labels: Vec<&str> = PositionState::ALL.iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["b", "c", "d", "e"]);
        assert_eq!(PositionState::from_label("d"), Some(PositionState::Third));
    }
}
