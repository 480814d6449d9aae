//! Span-tag vocabulary shared with downstream sequence taggers.
//!
//! Each word of length `n` is labelled from its right edge inward so that the three
//! final positions are always distinguishable: `S`, `B E`, `B E2 E`, `B E3 E2 E`, and
//! `B M.. E3 E2 E` for five or more characters.  The labels are part of the feature
//! format consumed elsewhere and must not change.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a character inside its word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpanTag {
    /// First character of a multi-character word.
    #[serde(rename = "B")]
    Begin,
    /// Interior character at least four positions from the end.
    #[serde(rename = "M")]
    Middle,
    /// Third character from the end.
    #[serde(rename = "E3")]
    E3,
    /// Second character from the end.
    #[serde(rename = "E2")]
    E2,
    /// Last character of a multi-character word.
    #[serde(rename = "E")]
    End,
    /// A one-character word.
    #[serde(rename = "S")]
    Single,
}

impl SpanTag {
    /// Every tag, in label order.
    pub const ALL: [SpanTag; 6] = [
        SpanTag::Begin,
        SpanTag::Middle,
        SpanTag::E3,
        SpanTag::E2,
        SpanTag::End,
        SpanTag::Single,
    ];

    /// Stable string label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            SpanTag::Begin => "B",
            SpanTag::Middle => "M",
            SpanTag::E3 => "E3",
            SpanTag::E2 => "E2",
            SpanTag::End => "E",
            SpanTag::Single => "S",
        }
    }

    /// Parses a label produced by [`SpanTag::label`].
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.label() == label)
    }
}

impl fmt::Display for SpanTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tags for a word of `len` characters; empty for `len == 0`.
#[must_use]
pub fn word_tags(len: usize) -> Vec<SpanTag> {
    match len {
        0 => Vec::new(),
        1 => vec![SpanTag::Single],
        _ => {
            let mut tags = Vec::with_capacity(len);
            tags.push(SpanTag::Begin);
            let tail: &[SpanTag] = match len {
                2 => &[SpanTag::End],
                3 => &[SpanTag::E2, SpanTag::End],
                _ => &[SpanTag::E3, SpanTag::E2, SpanTag::End],
            };
            tags.extend(std::iter::repeat(SpanTag::Middle).take(len - 1 - tail.len()));
            tags.extend_from_slice(tail);
            tags
        }
    }
}

/// Concatenated tags for a word sequence, one per character.
pub fn tags_for_words<I, S>(words: I) -> Vec<SpanTag>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .flat_map(|word| word_tags(word.as_ref().chars().count()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(len: usize) -> Vec<&'static str> {
        word_tags(len).into_iter().map(SpanTag::label).collect()
    }

    #[test]
    fn tags_by_word_length() {
        assert!(labels(0).is_empty());
        assert_eq!(labels(1), vec!["S"]);
        assert_eq!(labels(2), vec!["B", "E"]);
        assert_eq!(labels(3), vec!["B", "E2", "E"]);
        assert_eq!(labels(4), vec!["B", "E3", "E2", "E"]);
        assert_eq!(labels(5), vec!["B", "M", "E3", "E2", "E"]);
        assert_eq!(labels(7), vec!["B", "M", "M", "M", "E3", "E2", "E"]);
    }

    #[test]
    fn tags_cover_every_character() {
        let tags = tags_for_words(["天下", "为", "公"]);
        assert_eq!(tags, vec![SpanTag::Begin, SpanTag::End, SpanTag::Single, SpanTag::Single]);
    }

    #[test]
    fn labels_round_trip() {
        for tag in SpanTag::ALL {
            assert_eq!(SpanTag::from_label(tag.label()), Some(tag));
            assert_eq!(tag.to_string(), tag.label());
        }
        assert_eq!(SpanTag::from_label("X"), None);
        assert_eq!(serde_json::to_string(&SpanTag::E3).unwrap(), "\"E3\"");
    }
}
