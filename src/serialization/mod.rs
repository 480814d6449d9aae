//! Helpers for persisting lexicons, dictionaries, and scorer models.

pub mod binary;
pub mod lexicon_csv;

pub use binary::{
    clear_cache, load_snapshot, read_bincode, save_snapshot, write_bincode_atomic,
    SourceSignature,
};
pub use lexicon_csv::{load_lexicon_csv, read_lexicon_csv, save_lexicon_csv, write_lexicon_csv};
