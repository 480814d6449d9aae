//! CSV persistence for lexicons using the `Word,Frequency,PMI,R_Entropy,L_Entropy` layout.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Result, WensegError};
use crate::lexicon::{Lexicon, LexiconEntry};

/// Writes the header and one row per entry, in the lexicon's current order.
pub fn write_lexicon_csv<W: Write>(lexicon: &Lexicon, writer: W) -> Result<()> {
    let mut csv_writer = ::csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);
    if lexicon.is_empty() {
        csv_writer.write_record(["Word", "Frequency", "PMI", "R_Entropy", "L_Entropy"])?;
    }
    for entry in lexicon {
        csv_writer.serialize(entry)?;
    }
    csv_writer
        .flush()
        .map_err(|err| WensegError::io(err, None))
}

/// Persists a lexicon to `path`.
pub fn save_lexicon_csv<P: AsRef<Path>>(lexicon: &Lexicon, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|err| WensegError::io(err, Some(path.to_path_buf())))?;
    write_lexicon_csv(lexicon, BufWriter::new(file))
}

/// Reads a lexicon previously written by [`write_lexicon_csv`], preserving row order.
pub fn read_lexicon_csv<R: Read>(reader: R) -> Result<Lexicon> {
    let mut csv_reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);
    csv_reader
        .deserialize::<LexiconEntry>()
        .map(|row| row.map_err(WensegError::from))
        .collect()
}

/// Loads a lexicon CSV from `path`.
pub fn load_lexicon_csv<P: AsRef<Path>>(path: P) -> Result<Lexicon> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| WensegError::io(err, Some(path.to_path_buf())))?;
    read_lexicon_csv(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Lexicon {
        Lexicon::new(vec![
            LexiconEntry {
                word: "天".into(),
                frequency: 42,
                pmi: 80.0,
                r_entropy: 3.5,
                l_entropy: 3.25,
            },
            LexiconEntry {
                word: "大道".into(),
                frequency: 15,
                pmi: 123.456,
                r_entropy: 2.75,
                l_entropy: 2.125,
            },
        ])
    }

    #[test]
    fn csv_starts_with_review_header() {
        let mut buffer = Vec::new();
        write_lexicon_csv(&sample(), &mut buffer).expect("write");
        let text = String::from_utf8(buffer).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Word,Frequency,PMI,R_Entropy,L_Entropy"));
        assert_eq!(lines.next(), Some("天,42,80.0,3.5,3.25"));
        assert_eq!(lines.next(), Some("大道,15,123.456,2.75,2.125"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn empty_lexicon_still_writes_header() {
        let mut buffer = Vec::new();
        write_lexicon_csv(&Lexicon::default(), &mut buffer).expect("write");
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "Word,Frequency,PMI,R_Entropy,L_Entropy\n"
        );
    }

    #[test]
    fn saved_file_loads_back() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("lexicon.csv");
        let lexicon = sample();
        lexicon.save_csv(&path).expect("save");
        assert_eq!(load_lexicon_csv(&path).expect("load"), lexicon);
    }
}
