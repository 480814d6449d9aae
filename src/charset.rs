//! Character-class helpers that split raw text into Han runs and everything else.
//!
//! Every engine in the crate works on maximal runs of Han characters.  The helpers in
//! this module decide what counts as Han, normalise half-width punctuation, and carve
//! text into [`Chunk`]s without allocating.

use rustc_hash::FxHashSet;

/// Function characters that never bind into multi-character words.
///
/// Sentence-final particles and high-frequency grammatical words of literary Chinese.
pub const DEFAULT_STOPCHARS: &[char] = &[
    '之', '乎', '者', '也', '矣', '焉', '哉', '兮', '而', '其', '于', '於', '与', '乃', '则',
    '夫', '耶', '邪', '欤', '耳', '尔', '曰', '亦', '且',
];

const PUNCTUATION_PAIRS: &[(char, char)] = &[
    (',', '，'),
    ('.', '。'),
    (':', '：'),
    ('!', '！'),
    ('?', '？'),
    (';', '；'),
];

/// Returns `true` for CJK unified ideographs, including the extension and compatibility blocks.
#[must_use]
pub fn is_han(ch: char) -> bool {
    matches!(
        ch as u32,
        0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF | 0x2_0000..=0x3_134F
    )
}

/// Replaces half-width sentence punctuation with the full-width forms used in classical texts.
#[must_use]
pub fn normalize_punctuation(text: &str) -> String {
    text.chars()
        .map(|ch| {
            PUNCTUATION_PAIRS
                .iter()
                .find_map(|&(ascii, full)| (ascii == ch).then_some(full))
                .unwrap_or(ch)
        })
        .collect()
}

/// Removes every whitespace character.
#[must_use]
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|ch| !ch.is_whitespace()).collect()
}

/// A maximal slice of text that is either entirely Han or entirely non-Han.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk<'a> {
    /// Contiguous Han characters.
    Han(&'a str),
    /// Contiguous characters of any other class (punctuation, digits, Latin, whitespace).
    Other(&'a str),
}

impl<'a> Chunk<'a> {
    /// Returns the underlying slice regardless of class.
    #[must_use]
    pub fn as_str(&self) -> &'a str {
        match self {
            Self::Han(text) | Self::Other(text) => text,
        }
    }

    /// Returns `true` when the chunk holds Han characters.
    #[must_use]
    pub fn is_han(&self) -> bool {
        matches!(self, Self::Han(_))
    }
}

/// Splits off the first chunk of `text`, or `None` when `text` is empty.
#[must_use]
pub fn leading_chunk(text: &str) -> Option<Chunk<'_>> {
    let first = text.chars().next()?;
    let han = is_han(first);
    let end = text
        .char_indices()
        .find(|&(_, ch)| is_han(ch) != han)
        .map_or(text.len(), |(idx, _)| idx);
    let slice = &text[..end];
    Some(if han {
        Chunk::Han(slice)
    } else {
        Chunk::Other(slice)
    })
}

/// Iterator over the alternating Han / non-Han chunks of a text.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = leading_chunk(self.rest)?;
        self.rest = &self.rest[chunk.as_str().len()..];
        Some(chunk)
    }
}

/// Splits `text` into chunks; concatenating the chunks reproduces `text`.
#[must_use]
pub fn chunks(text: &str) -> Chunks<'_> {
    Chunks { rest: text }
}

/// Yields only the Han runs of `text`.
pub fn han_runs(text: &str) -> impl Iterator<Item = &str> {
    chunks(text).filter_map(|chunk| match chunk {
        Chunk::Han(run) => Some(run),
        Chunk::Other(_) => None,
    })
}

/// Splits `text` into one slice per character.
pub fn char_slices(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .map(move |(idx, ch)| &text[idx..idx + ch.len_utf8()])
}

/// Set of characters that disqualify multi-character words.
#[derive(Debug, Clone, Default)]
pub struct StopChars {
    chars: FxHashSet<char>,
}

impl StopChars {
    /// Builds a set from any character iterator.
    pub fn new<I: IntoIterator<Item = char>>(chars: I) -> Self {
        Self {
            chars: chars.into_iter().collect(),
        }
    }

    /// Returns `true` if `ch` is a stopchar.
    #[must_use]
    pub fn contains(&self, ch: char) -> bool {
        self.chars.contains(&ch)
    }

    /// Returns `true` if any character of `word` is a stopchar.
    #[must_use]
    pub fn any_in(&self, word: &str) -> bool {
        word.chars().any(|ch| self.contains(ch))
    }

    /// Number of distinct stopchars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Returns `true` when the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

impl FromIterator<char> for StopChars {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        Self::new(iter)
    }
}
