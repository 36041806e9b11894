//! Inverted keyword index over the corpus.
//!
//! Maps every 2- and 3-character substring of a passage's cleaned original
//! text to the positions of the passages containing it. Built once from the
//! corpus; read-only afterwards. Passages missing either an original or an
//! explanation are not indexed — they can never produce a usable match.

use std::collections::HashMap;

use tracing::debug;

use crate::models::Corpus;
use crate::text::extract_keywords;

/// Position of a passage within the corpus: page index, then item index
/// within that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassagePos {
    pub page: usize,
    pub item: usize,
}

/// Keyword → passage-position buckets.
#[derive(Debug, Default)]
pub struct KeywordIndex {
    buckets: HashMap<String, Vec<PassagePos>>,
}

impl KeywordIndex {
    /// Build the index from a corpus. A passage is appended to the bucket of
    /// every keyword its original text produces; a passage may therefore
    /// appear under many keywords.
    pub fn build(corpus: &Corpus) -> Self {
        let mut buckets: HashMap<String, Vec<PassagePos>> = HashMap::new();

        for (page_idx, page) in corpus.pages.iter().enumerate() {
            for (item_idx, passage) in page.items.iter().enumerate() {
                if passage.original.is_empty() || passage.explanation.is_empty() {
                    continue;
                }
                let pos = PassagePos {
                    page: page_idx,
                    item: item_idx,
                };
                for keyword in extract_keywords(&passage.original) {
                    buckets.entry(keyword).or_default().push(pos);
                }
            }
        }

        debug!(keywords = buckets.len(), "keyword index built");
        Self { buckets }
    }

    pub fn get(&self, keyword: &str) -> Option<&[PassagePos]> {
        self.buckets.get(keyword).map(|bucket| bucket.as_slice())
    }

    /// Number of distinct keywords.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::strip_punctuation;

    fn corpus(json: &str) -> Corpus {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_empty_corpus_empty_index() {
        let index = KeywordIndex::build(&Corpus::default());
        assert!(index.is_empty());
    }

    #[test]
    fn test_every_keyword_maps_back_to_its_passage() {
        let c = corpus(
            r#"[{"page": 1, "title": "學而", "items": [
                {"original": "子曰：學而時習之", "explanation": "A"},
                {"original": "不亦說乎", "explanation": "B"}
            ]}]"#,
        );
        let index = KeywordIndex::build(&c);

        for (item, passage) in c.pages[0].items.iter().enumerate() {
            for keyword in extract_keywords(&passage.original) {
                let bucket = index.get(&keyword).unwrap_or_else(|| {
                    panic!("keyword {:?} missing from index", keyword);
                });
                assert!(
                    bucket.contains(&PassagePos { page: 0, item }),
                    "bucket for {:?} does not reference its source passage",
                    keyword
                );
                // Bucket invariant: the cleaned original contains the keyword
                for pos in bucket {
                    let original = &c.pages[pos.page].items[pos.item].original;
                    assert!(strip_punctuation(original).contains(&keyword));
                }
            }
        }
    }

    #[test]
    fn test_passages_without_explanation_not_indexed() {
        let c = corpus(
            r#"[{"page": 1, "title": "", "items": [
                {"original": "學而時習之", "explanation": ""}
            ]}]"#,
        );
        let index = KeywordIndex::build(&c);
        assert!(index.is_empty());
    }

    #[test]
    fn test_shared_keyword_buckets_both_passages() {
        let c = corpus(
            r#"[{"page": 1, "title": "", "items": [
                {"original": "不亦說乎", "explanation": "A"},
                {"original": "不亦樂乎", "explanation": "B"}
            ]}]"#,
        );
        let index = KeywordIndex::build(&c);
        let bucket = index.get("不亦").unwrap();
        assert_eq!(bucket.len(), 2);
    }
}
