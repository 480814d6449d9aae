//! Common interface over the two segmenters.

use crate::dag::DagSegmenter;
use crate::hmm::HmmSegmenter;
use crate::scorer::Scorer;

/// Anything that turns text into a lazy sequence of tokens.
///
/// Each call starts from scratch; implementations keep no state between calls.
pub trait Segmenter {
    /// Lazily segments `text`.
    fn segment<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = String> + 'a>;

    /// Segments `text` and collects the tokens.
    fn segment_all(&self, text: &str) -> Vec<String> {
        self.segment(text).collect()
    }
}

impl Segmenter for DagSegmenter {
    fn segment<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = String> + 'a> {
        Box::new(self.tokenize(text).map(str::to_string))
    }
}

impl<S: Scorer> Segmenter for HmmSegmenter<S> {
    fn segment<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = String> + 'a> {
        Box::new(self.tokenize(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::PrefixDict;
    use crate::scorer::CharNgramModel;

    #[test]
    fn both_segmenters_cover_han_text() {
        let text = "天下大道天下为公";
        let dag = DagSegmenter::new(PrefixDict::from_entries([
            ("天下", 50u64),
            ("大道", 15),
            ("为公", 5),
        ]));
        let model = CharNgramModel::train(&["天下大道", "天下为公", "大道为公"], 3).unwrap();
        let hmm = HmmSegmenter::new(model);

        let engines: Vec<&dyn Segmenter> = vec![&dag, &hmm];
        for engine in engines {
            assert_eq!(engine.segment_all(text).concat(), text);
        }
        assert_eq!(dag.segment_all(text), vec!["天下", "大道", "天下", "为公"]);
    }
}
