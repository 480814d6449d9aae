//! Facilities for discovering corpus files and scanning them into clean Han runs.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::charset::{han_runs, normalize_punctuation};
use crate::config::IngestConfig;
use crate::error::{Result, WensegError};

/// Discovers files rooted at the provided input paths according to the ingest configuration.
///
/// Directories are traversed recursively by default; set [`IngestConfig::recursive`] to `false`
/// to limit discovery to the first level.  Symlink traversal is controlled through
/// [`IngestConfig::follow_symlinks`].  The returned list is sorted so corpus order is stable.
pub fn collect_paths<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(WensegError::InvalidConfig(format!(
                "input path {path:?} does not exist"
            )));
        }
        let metadata = path
            .symlink_metadata()
            .map_err(|err| WensegError::io(err, Some(path.to_path_buf())))?;
        if metadata.is_dir() {
            let depth = if cfg.recursive { usize::MAX } else { 1 };
            let walker = WalkDir::new(path)
                .max_depth(depth)
                .follow_links(cfg.follow_symlinks)
                .sort_by_file_name();
            for entry in walker {
                let entry = entry.map_err(|err| WensegError::Internal(err.to_string()))?;
                if entry.file_type().is_file() {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            files.push(path.to_path_buf());
        }
    }
    if files.is_empty() {
        return Err(WensegError::InvalidConfig(
            "no files discovered in provided inputs".into(),
        ));
    }
    Ok(files)
}

/// Pull-based scanner yielding cleaned Han runs from a line-oriented source.
///
/// Each line is split on whitespace, half-width punctuation is widened, and every maximal
/// run of Han characters is yielded.  Lines that are not valid UTF-8 are skipped.
#[derive(Debug)]
pub struct CorpusScanner<R> {
    reader: R,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    lines_read: usize,
    skipped_lines: usize,
}

impl<R: BufRead> CorpusScanner<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            pending: VecDeque::new(),
            lines_read: 0,
            skipped_lines: 0,
        }
    }

    /// Number of lines consumed so far.
    #[must_use]
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Number of lines dropped because they were not valid UTF-8.
    #[must_use]
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    fn fill(&mut self) -> std::io::Result<bool> {
        self.buffer.clear();
        if self.reader.read_until(b'\n', &mut self.buffer)? == 0 {
            return Ok(false);
        }
        self.lines_read += 1;
        match std::str::from_utf8(&self.buffer) {
            Ok(line) => {
                for segment in line.split_whitespace() {
                    let normalized = normalize_punctuation(segment);
                    self.pending
                        .extend(han_runs(&normalized).map(str::to_owned));
                }
            }
            Err(err) => {
                self.skipped_lines += 1;
                debug!("skipping line {} with invalid UTF-8: {err}", self.lines_read);
            }
        }
        Ok(true)
    }
}

impl<R: BufRead> Iterator for CorpusScanner<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(run) = self.pending.pop_front() {
                return Some(Ok(run));
            }
            match self.fill() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(err) => return Some(Err(WensegError::io(err, None))),
            }
        }
    }
}

/// Scans an in-memory text into Han runs.
#[must_use]
pub fn scan_text(text: &str) -> Vec<String> {
    text.split_whitespace()
        .flat_map(|segment| {
            let normalized = normalize_punctuation(segment);
            han_runs(&normalized).map(str::to_owned).collect::<Vec<_>>()
        })
        .collect()
}

/// Opens a file and returns a scanner over it.
pub fn scan_file<P: AsRef<Path>>(path: P) -> Result<CorpusScanner<BufReader<File>>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| WensegError::io(err, Some(path.to_path_buf())))?;
    Ok(CorpusScanner::new(BufReader::new(file)))
}

/// Loads every Han run from the discovered input files, in path order.
pub fn load_corpus<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<Vec<String>> {
    let file_paths = collect_paths(inputs, cfg)?;
    let mut runs = Vec::new();
    for file_path in file_paths {
        let mut scanner = scan_file(&file_path)?;
        for run in scanner.by_ref() {
            let run = run.map_err(|err| match err {
                WensegError::Io { source, .. } => WensegError::io(source, Some(file_path.clone())),
                other => other,
            })?;
            runs.push(run);
        }
        if scanner.skipped_lines() > 0 {
            debug!(
                "{}: skipped {} of {} lines",
                file_path.display(),
                scanner.skipped_lines(),
                scanner.lines_read()
            );
        }
    }
    if runs.is_empty() {
        return Err(WensegError::InvalidConfig(
            "no Han text could be loaded from inputs".into(),
        ));
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn scanner_splits_runs_on_punctuation_and_whitespace() {
        let input = "天下大乱,贤圣不明 道德不一\n\n子曰：学而时习之\n";
        let runs: Vec<String> = CorpusScanner::new(Cursor::new(input))
            .collect::<Result<_>>()
            .expect("scan");
        assert_eq!(
            runs,
            vec!["天下大乱", "贤圣不明", "道德不一", "子曰", "学而时习之"]
        );
    }

    #[test]
    fn scanner_skips_invalid_utf8_lines() {
        let mut bytes = "天地\n".as_bytes().to_vec();
        bytes.extend_from_slice(&[0xFF, 0xFE, b'\n']);
        bytes.extend_from_slice("玄黄".as_bytes());
        let mut scanner = CorpusScanner::new(Cursor::new(bytes));
        let runs: Vec<String> = scanner.by_ref().collect::<Result<_>>().expect("scan");
        assert_eq!(runs, vec!["天地", "玄黄"]);
        assert_eq!(scanner.skipped_lines(), 1);
        assert_eq!(scanner.lines_read(), 3);
    }

    #[test]
    fn collect_paths_discovers_files_recursively() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).expect("create nested directory");
        let file_a = dir.path().join("a.txt");
        let file_b = nested.join("b.txt");
        fs::write(&file_a, "天地").expect("write a");
        fs::write(&file_b, "玄黄").expect("write b");

        let mut paths = collect_paths(&[dir.path()], &IngestConfig::default()).expect("paths");
        paths.sort();
        assert_eq!(paths, vec![file_a.clone(), file_b]);

        let shallow = IngestConfig {
            recursive: false,
            ..IngestConfig::default()
        };
        let paths = collect_paths(&[dir.path()], &shallow).expect("paths");
        assert_eq!(paths, vec![file_a]);
    }

    #[test]
    fn load_corpus_rejects_text_without_han() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("latin.txt");
        fs::write(&file, "only latin, 123").expect("write");
        let err = load_corpus(&[file], &IngestConfig::default()).expect_err("no runs");
        assert!(matches!(err, WensegError::InvalidConfig(_)));
    }

    #[test]
    fn scan_text_matches_scanner() {
        let text = "天下 大乱.贤圣";
        let streamed: Vec<String> = CorpusScanner::new(Cursor::new(text))
            .collect::<Result<_>>()
            .expect("scan");
        assert_eq!(scan_text(text), streamed);
    }
}
