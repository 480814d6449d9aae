//! Configuration builders controlling lexicon construction, HMM decoding, and corpus ingestion.

use serde::{Deserialize, Serialize};

use crate::charset::{StopChars, DEFAULT_STOPCHARS};
use crate::error::{Result, WensegError};

/// Configuration for PMI / boundary-entropy lexicon construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LexiconConfig {
    /// Longest candidate word in characters. Substrings one character longer are indexed as lookahead.
    pub max_word_len: usize,
    /// Minimum number of occurrences for a candidate to be accepted.
    pub min_frequency: u64,
    /// Minimum pointwise mutual information for a candidate to be accepted.
    pub min_pmi: f64,
    /// Minimum right and left boundary entropy (bits) for a candidate to be accepted.
    pub min_entropy: f64,
    /// PMI assigned to single characters and upper bound for every other candidate.
    pub pmi_ceiling: f64,
    /// Characters that disqualify any multi-character candidate containing them.
    pub stopchars: Vec<char>,
    /// Number of corpus shards built in parallel; `None` uses one shard per Rayon thread.
    pub shards: Option<usize>,
    /// Enables phase summaries through the `log` facade.
    pub show_progress: bool,
}

impl LexiconConfig {
    /// Returns a builder initialised with [`LexiconConfig::default`].
    #[must_use]
    pub fn builder() -> LexiconBuilder {
        LexiconBuilder::default()
    }

    /// Length of the longest substring inserted into the tries.
    #[must_use]
    pub fn max_segment_len(&self) -> usize {
        self.max_word_len + 1
    }

    /// Builds the stopchar lookup set.
    #[must_use]
    pub fn stopchar_set(&self) -> StopChars {
        self.stopchars.iter().copied().collect()
    }

    /// Validates the invariants required for construction.
    pub fn validate(&self) -> Result<()> {
        if self.max_word_len == 0 {
            return Err(WensegError::InvalidConfig(
                "max_word_len must be greater than zero".into(),
            ));
        }
        if self.min_frequency == 0 {
            return Err(WensegError::InvalidConfig(
                "min_frequency must be greater than zero".into(),
            ));
        }
        if !self.min_pmi.is_finite() || !self.min_entropy.is_finite() {
            return Err(WensegError::InvalidConfig(
                "min_pmi and min_entropy must be finite".into(),
            ));
        }
        if self.min_entropy < 0.0 {
            return Err(WensegError::InvalidConfig(format!(
                "min_entropy ({}) must not be negative",
                self.min_entropy
            )));
        }
        if !self.pmi_ceiling.is_finite() || self.pmi_ceiling < self.min_pmi {
            return Err(WensegError::InvalidConfig(format!(
                "pmi_ceiling ({}) must be finite and at least min_pmi ({})",
                self.pmi_ceiling, self.min_pmi
            )));
        }
        if self.shards == Some(0) {
            return Err(WensegError::InvalidConfig(
                "shards must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            max_word_len: 4,
            min_frequency: 10,
            min_pmi: 80.0,
            min_entropy: 2.0,
            pmi_ceiling: 1_000_000.0,
            stopchars: DEFAULT_STOPCHARS.to_vec(),
            shards: None,
            show_progress: true,
        }
    }
}

/// Builder for [`LexiconConfig`].
#[derive(Debug, Default, Clone)]
pub struct LexiconBuilder {
    cfg: LexiconConfig,
}

impl LexiconBuilder {
    /// Creates a builder with [`LexiconConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the longest candidate word length.
    #[must_use]
    pub fn max_word_len(mut self, value: usize) -> Self {
        self.cfg.max_word_len = value;
        self
    }

    /// Sets the minimum candidate frequency.
    #[must_use]
    pub fn min_frequency(mut self, value: u64) -> Self {
        self.cfg.min_frequency = value;
        self
    }

    /// Sets the minimum PMI threshold.
    #[must_use]
    pub fn min_pmi(mut self, value: f64) -> Self {
        self.cfg.min_pmi = value;
        self
    }

    /// Sets the minimum boundary entropy threshold.
    #[must_use]
    pub fn min_entropy(mut self, value: f64) -> Self {
        self.cfg.min_entropy = value;
        self
    }

    /// Sets the PMI ceiling.
    #[must_use]
    pub fn pmi_ceiling(mut self, value: f64) -> Self {
        self.cfg.pmi_ceiling = value;
        self
    }

    /// Overrides the stopchar inventory.
    #[must_use]
    pub fn stopchars<I>(mut self, chars: I) -> Self
    where
        I: IntoIterator<Item = char>,
    {
        self.cfg.stopchars = chars.into_iter().collect();
        self
    }

    /// Sets the number of parallel build shards.
    #[must_use]
    pub fn shards(mut self, value: Option<usize>) -> Self {
        self.cfg.shards = value;
        self
    }

    /// Enables or disables phase logging.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Finalises the builder, returning a validated [`LexiconConfig`].
    pub fn build(mut self) -> Result<LexiconConfig> {
        self.cfg.stopchars.sort_unstable();
        self.cfg.stopchars.dedup();
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Hand-tuned transition probabilities between the four position states.
///
/// Field names read `<from><to>` with `b` word-initial, `c` second, `d` third and `e`
/// fourth-or-later.  Raising the to-`b` probabilities favours short words.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TransitionProbs {
    /// word-initial to word-initial.
    pub bb: f64,
    /// word-initial to second.
    pub bc: f64,
    /// second to word-initial.
    pub cb: f64,
    /// second to third.
    pub cd: f64,
    /// third to word-initial.
    pub db: f64,
    /// third to fourth-or-later.
    pub de: f64,
    /// fourth-or-later to word-initial.
    pub eb: f64,
    /// fourth-or-later to fourth-or-later.
    pub ee: f64,
}

impl TransitionProbs {
    fn all(&self) -> [(&'static str, f64); 8] {
        [
            ("bb", self.bb),
            ("bc", self.bc),
            ("cb", self.cb),
            ("cd", self.cd),
            ("db", self.db),
            ("de", self.de),
            ("eb", self.eb),
            ("ee", self.ee),
        ]
    }
}

impl Default for TransitionProbs {
    fn default() -> Self {
        Self {
            bb: 0.85,
            bc: 0.15,
            cb: 0.9925,
            cd: 0.0075,
            db: 0.999,
            de: 0.001,
            eb: 0.9999,
            ee: 0.0001,
        }
    }
}

/// Configuration for the character-position HMM segmenter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HmmConfig {
    /// Transition probabilities (linear scale; converted to log10 on construction).
    pub transitions: TransitionProbs,
    /// Emission score used when a state's window cannot be formed.
    pub emission_floor: f64,
    /// Initial score of the states that cannot start a run.
    pub unreachable_score: f64,
    /// Characters that prevent a decoded word from being emitted as a unit.
    pub stopchars: Vec<char>,
}

impl HmmConfig {
    /// Returns a builder initialised with [`HmmConfig::default`].
    #[must_use]
    pub fn builder() -> HmmBuilder {
        HmmBuilder::default()
    }

    /// Validates probability ranges and sentinel scores.
    pub fn validate(&self) -> Result<()> {
        for (name, prob) in self.transitions.all() {
            if !(prob > 0.0 && prob <= 1.0) {
                return Err(WensegError::InvalidConfig(format!(
                    "transition probability {name} ({prob}) must lie in (0, 1]"
                )));
            }
        }
        if !self.emission_floor.is_finite() || self.emission_floor >= 0.0 {
            return Err(WensegError::InvalidConfig(format!(
                "emission_floor ({}) must be finite and negative",
                self.emission_floor
            )));
        }
        if !self.unreachable_score.is_finite() || self.unreachable_score >= self.emission_floor {
            return Err(WensegError::InvalidConfig(format!(
                "unreachable_score ({}) must be finite and below emission_floor",
                self.unreachable_score
            )));
        }
        Ok(())
    }
}

impl Default for HmmConfig {
    fn default() -> Self {
        Self {
            transitions: TransitionProbs::default(),
            emission_floor: -100.0,
            unreachable_score: -3.14e100,
            stopchars: DEFAULT_STOPCHARS.to_vec(),
        }
    }
}

/// Builder for [`HmmConfig`].
#[derive(Debug, Default, Clone)]
pub struct HmmBuilder {
    cfg: HmmConfig,
}

impl HmmBuilder {
    /// Overrides the transition table.
    #[must_use]
    pub fn transitions(mut self, transitions: TransitionProbs) -> Self {
        self.cfg.transitions = transitions;
        self
    }

    /// Sets the emission floor.
    #[must_use]
    pub fn emission_floor(mut self, value: f64) -> Self {
        self.cfg.emission_floor = value;
        self
    }

    /// Overrides the stopchar inventory.
    #[must_use]
    pub fn stopchars<I>(mut self, chars: I) -> Self
    where
        I: IntoIterator<Item = char>,
    {
        self.cfg.stopchars = chars.into_iter().collect();
        self
    }

    /// Finalises the builder, returning a validated [`HmmConfig`].
    pub fn build(self) -> Result<HmmConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Configuration controlling how corpora are discovered on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestConfig {
    /// Enables recursive directory traversal.
    pub recursive: bool,
    /// Follows symlinks encountered during traversal.
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
        }
    }
}

impl IngestConfig {
    /// Returns a builder initialised with [`IngestConfig::default`].
    #[must_use]
    pub fn builder() -> IngestBuilder {
        IngestBuilder::default()
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug, Default, Clone)]
pub struct IngestBuilder {
    cfg: IngestConfig,
}

impl IngestBuilder {
    /// Enables or disables recursive directory traversal.
    #[must_use]
    pub fn recursive(mut self, enabled: bool) -> Self {
        self.cfg.recursive = enabled;
        self
    }

    /// Enables or disables following of symlinks when traversing directories.
    #[must_use]
    pub fn follow_symlinks(mut self, enabled: bool) -> Self {
        self.cfg.follow_symlinks = enabled;
        self
    }

    /// Finalises the builder, returning the [`IngestConfig`].
    pub fn build(self) -> IngestConfig {
        self.cfg
    }
}
