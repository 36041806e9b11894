//! Best-match passage search over the keyword index.
//!
//! # Scoring
//!
//! 1. Extract query keywords with the same rule used at index time.
//! 2. Accumulate a keyword-hit count per candidate passage, keyed by the
//!    passage's original text for the duration of the call.
//! 3. Score each candidate: `keyword_matches × 0.6 + char_jaccard × 0.4`.
//! 4. When no keyword hits at all, fall back to a bounded linear similarity
//!    scan over the head of the corpus.
//! 5. Sort by score (desc); the best candidate wins only above the
//!    acceptance threshold.
//!
//! All weights and thresholds come from [`MatcherConfig`].

use std::collections::HashMap;
use std::sync::OnceLock;

use tracing::debug;

use crate::config::MatcherConfig;
use crate::index::KeywordIndex;
use crate::models::Corpus;
use crate::text::{char_jaccard, extract_keywords};

/// A scored, per-query transient record referencing a passage. Discarded
/// after the call that produced it.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub original: String,
    pub explanation: String,
    pub page_id: String,
    pub title: String,
    pub score: f64,
    pub keyword_matches: usize,
}

/// Owns the corpus and its lazily built index. Searches are read-only and
/// re-entrant; nothing shared is written after the index is built.
pub struct Matcher {
    corpus: Corpus,
    config: MatcherConfig,
    index: OnceLock<KeywordIndex>,
}

impl Matcher {
    pub fn new(corpus: Corpus, config: MatcherConfig) -> Self {
        Self {
            corpus,
            config,
            index: OnceLock::new(),
        }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Build the index if it has not been built yet; otherwise a no-op.
    pub fn build_index(&self) -> &KeywordIndex {
        self.index.get_or_init(|| KeywordIndex::build(&self.corpus))
    }

    /// Number of distinct keywords in the (built) index.
    pub fn index_size(&self) -> usize {
        self.build_index().len()
    }

    /// The single best-matching passage, or `None` when nothing clears the
    /// acceptance threshold.
    pub fn search(&self, query: &str, limit: usize) -> Option<Candidate> {
        self.rank(query, limit)
            .into_iter()
            .next()
            .filter(|c| c.score > self.config.accept_threshold)
    }

    /// The top `limit` candidates by score, unthresholded. Used for
    /// diagnostic display; [`Matcher::search`] applies the threshold.
    pub fn rank(&self, query: &str, limit: usize) -> Vec<Candidate> {
        if query.trim().chars().count() < self.config.min_query_chars {
            return Vec::new();
        }
        let keywords = extract_keywords(query);
        if keywords.is_empty() {
            return Vec::new();
        }

        let index = self.build_index();

        // Per-call candidate map, keyed by original text.
        let mut candidates: HashMap<String, Candidate> = HashMap::new();

        for keyword in &keywords {
            let Some(bucket) = index.get(keyword) else {
                continue;
            };
            for pos in bucket {
                let page = &self.corpus.pages[pos.page];
                let passage = &page.items[pos.item];
                let entry = candidates
                    .entry(passage.original.clone())
                    .or_insert_with(|| Candidate {
                        original: passage.original.clone(),
                        explanation: passage.explanation.clone(),
                        page_id: page.page_id.clone(),
                        title: page.title.clone(),
                        score: 0.0,
                        keyword_matches: 0,
                    });
                entry.keyword_matches += 1;
            }
        }

        if candidates.is_empty() {
            self.fallback_scan(query, &mut candidates);
        } else {
            for candidate in candidates.values_mut() {
                let similarity = char_jaccard(query, &candidate.original);
                candidate.score = candidate.keyword_matches as f64 * self.config.keyword_weight
                    + similarity * self.config.similarity_weight;
            }
        }

        let mut ranked: Vec<Candidate> = candidates.into_values().collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(limit);

        if let Some(best) = ranked.first() {
            debug!(
                score = best.score,
                keyword_matches = best.keyword_matches,
                page = %best.page_id,
                "best candidate"
            );
        }
        ranked
    }

    /// No keyword hit anywhere: scan the head of the corpus directly,
    /// keeping any passage whose similarity clears the fallback floor.
    /// Bounded to cap worst-case cost; recall over the tail is sacrificed.
    fn fallback_scan(&self, query: &str, candidates: &mut HashMap<String, Candidate>) {
        let mut scanned = 0;
        'pages: for page in &self.corpus.pages {
            for passage in &page.items {
                if scanned >= self.config.fallback_scan_limit {
                    break 'pages;
                }
                scanned += 1;
                if passage.original.is_empty() || passage.explanation.is_empty() {
                    continue;
                }
                let similarity = char_jaccard(query, &passage.original);
                if similarity > self.config.fallback_min_similarity {
                    candidates.insert(
                        passage.original.clone(),
                        Candidate {
                            original: passage.original.clone(),
                            explanation: passage.explanation.clone(),
                            page_id: page.page_id.clone(),
                            title: page.title.clone(),
                            score: similarity,
                            keyword_matches: 0,
                        },
                    );
                }
            }
        }
        debug!(scanned, found = candidates.len(), "fallback similarity scan");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(json: &str) -> Matcher {
        let corpus: Corpus = serde_json::from_str(json).unwrap();
        Matcher::new(corpus, MatcherConfig::default())
    }

    fn analects() -> Matcher {
        matcher(
            r#"[{"page": 1, "title": "學而第一", "items": [
                {"original": "子曰：學而時習之", "explanation": "A"},
                {"original": "不亦說乎", "explanation": "B"},
                {"original": "有朋自遠方來", "explanation": "C"}
            ]}]"#,
        )
    }

    #[test]
    fn test_rejects_empty_and_short_queries() {
        let m = analects();
        assert!(m.search("", 5).is_none());
        assert!(m.search("   ", 5).is_none());
        assert!(m.search("學", 5).is_none());
    }

    #[test]
    fn test_rejects_punctuation_only_query() {
        let m = analects();
        // Long enough after trimming, but no keywords survive cleaning
        assert!(m.search("。，！？；", 5).is_none());
    }

    #[test]
    fn test_exact_query_scores_full_similarity() {
        let m = analects();
        let best = m.search("不亦說乎", 5).expect("expected a match");
        assert_eq!(best.explanation, "B");
        // query == original, so similarity is 1.0
        let floor = best.keyword_matches as f64 * 0.6;
        assert!(best.score >= floor);
        assert!((best.score - (floor + 0.4)).abs() < 1e-9);
    }

    #[test]
    fn test_keyword_matches_counted_per_keyword() {
        let m = analects();
        let best = m.search("不亦說乎", 5).unwrap();
        // 2 trigrams + 3 bigrams all hit the same passage
        assert_eq!(best.keyword_matches, 5);
    }

    #[test]
    fn test_no_shared_characters_returns_none() {
        let m = analects();
        assert!(m.search("ABCDEFG", 5).is_none());
    }

    #[test]
    fn test_empty_corpus_returns_none() {
        let m = matcher("[]");
        assert!(m.search("子曰學而時習之", 5).is_none());
        assert_eq!(m.index_size(), 0);
    }

    #[test]
    fn test_build_index_idempotent() {
        let m = analects();
        let size_first = m.index_size();
        m.build_index();
        assert_eq!(m.index_size(), size_first);
        assert!(size_first > 0);
    }

    #[test]
    fn test_fallback_scan_on_keyword_miss() {
        // No 2- or 3-char run of the query appears in the corpus, but most
        // characters do, so the fallback similarity scan still matches.
        let m = matcher(
            r#"[{"page": 1, "title": "", "items": [
                {"original": "學而時習之", "explanation": "gloss"}
            ]}]"#,
        );
        let best = m.search("之學時", 5).expect("fallback should match");
        assert_eq!(best.keyword_matches, 0);
        assert!(best.score > 0.15);
    }

    #[test]
    fn test_rank_orders_by_score() {
        let m = analects();
        let ranked = m.rank("子曰學而時習之不亦說乎", 5);
        assert!(ranked.len() >= 2);
        for pair in ranked.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_score_bounds() {
        let m = analects();
        for candidate in m.rank("子曰學而時習之不亦說乎", 5) {
            let max = candidate.keyword_matches as f64 * 0.6 + 0.4;
            assert!(candidate.score >= 0.0 && candidate.score <= max + 1e-9);
        }
    }
}
