//! Unsupervised word discovery and segmentation for classical Chinese.
//!
//! The crate exposes a library API and a `wenseg` command line interface around three
//! independent engines:
//!
//! * [`LexiconConstructor`] induces a lexicon from raw text using pointwise mutual
//!   information and left/right boundary entropy over character tries.
//! * [`HmmSegmenter`] tags characters with word-position states by Viterbi decoding,
//!   taking emission scores from any [`Scorer`] (a character n-gram model is included).
//! * [`DagSegmenter`] finds the most probable segmentation against a weighted prefix
//!   dictionary.
//!
//! ```no_run
//! use wenseg::{IngestConfig, LexiconConfig, LexiconConstructor};
//!
//! # fn main() -> wenseg::Result<()> {
//! let cfg = LexiconConfig::builder()
//!     .min_frequency(10)
//!     .min_pmi(80.0)
//!     .show_progress(false)
//!     .build()?;
//! let constructor = LexiconConstructor::new(cfg);
//! let artifacts = constructor.construct_from_paths(&["/path/to/corpus"], &IngestConfig::default())?;
//! artifacts.lexicon.save_csv("lexicon.csv")?;
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature.  Library users can disable
//! default features to avoid the CLI dependencies:
//! `wenseg = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::multiple_crate_versions
)]

pub mod charset;
pub mod config;
pub mod corpus;
pub mod dag;
pub mod error;
pub mod hmm;
pub mod lexicon;
pub mod metrics;
pub mod scorer;
pub mod segment;
pub mod serialization;
pub mod tags;

pub use config::{HmmConfig, IngestConfig, LexiconBuilder, LexiconConfig, TransitionProbs};
pub use dag::{DagSegmenter, PrefixDict};
pub use error::{Result, WensegError};
pub use hmm::{HmmSegmenter, PositionState};
pub use lexicon::{Lexicon, LexiconArtifacts, LexiconConstructor, LexiconEntry};
pub use metrics::ConstructionMetrics;
pub use scorer::{CharNgramModel, Scorer};
pub use segment::Segmenter;
pub use tags::SpanTag;
