//! Metrics describing a lexicon construction run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Aggregate metrics produced by a construction session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConstructionMetrics {
    /// Number of Han runs consumed.
    pub runs: usize,
    /// Number of substring insertions into the forward trie.
    pub total_segments: u64,
    /// Number of shards the build phase was split into.
    pub shards: usize,
    /// Node count of the forward trie, root included.
    pub trie_nodes: usize,
    /// Node count of the reversed trie, root included.
    pub reversed_trie_nodes: usize,
    /// Candidates that received PMI and entropy scores.
    pub candidates_scored: usize,
    /// Candidates that cleared every threshold.
    pub accepted: usize,
    /// Time spent inserting substrings and merging shards.
    pub build_duration: Duration,
    /// Time spent scoring candidates.
    pub compute_duration: Duration,
    /// Time spent filtering and collecting accepted candidates.
    pub filter_duration: Duration,
    /// Total duration of the session.
    pub total_duration: Duration,
    /// Resident set size sampled after the build phase, on Linux.
    pub rss_kb: Option<usize>,
}

#[cfg(target_os = "linux")]
fn current_rss_kb() -> Option<usize> {
    use std::fs::File;
    use std::io::{BufRead, BufReader};

    let file = File::open("/proc/self/status").ok()?;
    for line in BufReader::new(file).lines().map_while(Result::ok) {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            let value = rest
                .split_whitespace()
                .find_map(|part| part.parse::<usize>().ok());
            return value;
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
fn current_rss_kb() -> Option<usize> {
    None
}

/// Samples the current resident set size (RSS) on supported platforms.
pub fn sample_rss_kb() -> Option<usize> {
    current_rss_kb()
}
