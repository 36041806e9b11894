//! Gloss merging: when a query spans several consecutive corpus passages,
//! stitch their explanations together.
//!
//! Starting from the first matched passage, the walk moves forward through
//! its page (and, if the page ends cleanly, into the head of the next page)
//! and appends the explanation of every passage the query appears to cover.
//! Inclusion is an OR of four independent signals, from strictest to
//! loosest; see the predicate functions below. A bounded run of consecutive
//! misses is tolerated so short interstitial annotations do not end the walk
//! early.
//!
//! Nothing here fails: an unlocatable start position degrades to the single
//! first-match explanation.

use tracing::{debug, trace};

use crate::config::MatcherConfig;
use crate::matcher::Candidate;
use crate::models::{Corpus, Passage};
use crate::text::{
    char_jaccard, containment_ratio, normalize_quotes, strip_leading_preamble, strip_punctuation,
    truncate_chars,
};

/// How much of each explanation's head is compared when re-locating a match
/// whose text drifted between index time and corpus time.
const EXPLANATION_PROBE_CHARS: usize = 20;
const EXPLANATION_PROBE_THRESHOLD: f64 = 0.5;

/// Merged gloss text plus the number of source passages it was stitched
/// from. `split_count` is 1 exactly when no subsequent passage was included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    pub text: String,
    pub split_count: usize,
}

/// Extend a first match with the glosses of the consecutive passages the
/// full query text covers.
pub fn merge_subsequent(
    corpus: &Corpus,
    query: &str,
    first: &Candidate,
    config: &MatcherConfig,
) -> MergeResult {
    let Some((page_idx, item_idx)) = locate(corpus, first) else {
        debug!(page = %first.page_id, "merge start position not found, returning single passage");
        return MergeResult {
            text: first.explanation.clone(),
            split_count: 1,
        };
    };

    let mut result = MergeResult {
        text: first.explanation.clone(),
        split_count: 1,
    };

    let page = &corpus.pages[page_idx];
    let mut misses = 0;
    let mut halted = false;

    for passage in page.items.iter().skip(item_idx + 1) {
        if passage.original.is_empty() || passage.explanation.is_empty() {
            continue;
        }
        if query_covers(query, passage, config) {
            include(&mut result, passage);
            misses = 0;
        } else {
            misses += 1;
            if misses > config.miss_tolerance {
                halted = true;
                break;
            }
        }
    }

    // Page ended within tolerance: the quoted run may continue onto the
    // next page, with its own independent miss counter.
    if !halted {
        if let Some(next_page) = corpus.pages.get(page_idx + 1) {
            let mut misses = 0;
            for passage in next_page.items.iter().take(config.next_page_scan_limit) {
                if passage.original.is_empty() || passage.explanation.is_empty() {
                    continue;
                }
                if query_covers(query, passage, config) {
                    include(&mut result, passage);
                    misses = 0;
                } else {
                    misses += 1;
                    if misses > config.miss_tolerance {
                        break;
                    }
                }
            }
        }
    }

    debug!(split_count = result.split_count, "merge complete");
    result
}

fn include(result: &mut MergeResult, passage: &Passage) {
    trace!(original = %passage.original, "passage included in merge");
    result.text.push_str("\n\n");
    result.text.push_str(&passage.explanation);
    result.split_count += 1;
}

/// Find the matched passage's position in the corpus: its page by id, then
/// the item by exact (original, explanation) equality. When exact equality
/// fails — formatting drift between the indexed and stored forms — fall back
/// to cleaned mutual containment, cross-checked against the head of each
/// explanation.
fn locate(corpus: &Corpus, first: &Candidate) -> Option<(usize, usize)> {
    let page_idx = corpus
        .pages
        .iter()
        .position(|p| p.page_id == first.page_id)?;
    let page = &corpus.pages[page_idx];

    if let Some(item_idx) = page
        .items
        .iter()
        .position(|p| p.original == first.original && p.explanation == first.explanation)
    {
        return Some((page_idx, item_idx));
    }

    let target = strip_punctuation(strip_leading_preamble(&first.original));
    if target.is_empty() {
        return None;
    }

    page.items
        .iter()
        .position(|p| {
            let cleaned = strip_punctuation(strip_leading_preamble(&p.original));
            if cleaned.is_empty() {
                return false;
            }
            if !cleaned.contains(&target) && !target.contains(&cleaned) {
                return false;
            }
            let probe_a = truncate_chars(&p.explanation, EXPLANATION_PROBE_CHARS);
            let probe_b = truncate_chars(&first.explanation, EXPLANATION_PROBE_CHARS);
            char_jaccard(probe_a, probe_b) > EXPLANATION_PROBE_THRESHOLD
        })
        .map(|item_idx| (page_idx, item_idx))
}

/// OR of the four inclusion signals.
fn query_covers(query: &str, passage: &Passage, config: &MatcherConfig) -> bool {
    contains_verbatim(query, &passage.original)
        || contains_stripped(query, &passage.original)
        || short_passage_overlap(query, &passage.original, config)
        || shares_key_phrase(query, &passage.original)
}

/// Signal 1: the query quotes the passage verbatim, allowing
/// visually-equivalent quotation glyphs to differ.
fn contains_verbatim(query: &str, original: &str) -> bool {
    query.contains(original) || normalize_quotes(query).contains(&normalize_quotes(original))
}

/// Signal 2: containment once punctuation is stripped from both sides.
fn contains_stripped(query: &str, original: &str) -> bool {
    let cleaned = strip_punctuation(original);
    !cleaned.is_empty() && strip_punctuation(query).contains(&cleaned)
}

/// Signal 3: the passage is short and its characters largely occur in the
/// query. Catches quotes abbreviated or reordered in the input.
fn short_passage_overlap(query: &str, original: &str, config: &MatcherConfig) -> bool {
    if original.chars().count() > config.short_passage_chars {
        return false;
    }
    let cleaned = strip_punctuation(original);
    containment_ratio(&cleaned, &strip_punctuation(query)) > config.short_overlap_threshold
}

/// Signal 4: some 3-character run of the passage appears verbatim in the
/// query — a "key phrase" hit for near-matches the stricter checks miss.
fn shares_key_phrase(query: &str, original: &str) -> bool {
    let cleaned: Vec<char> = strip_punctuation(original).chars().collect();
    let query_cleaned = strip_punctuation(query);
    cleaned
        .windows(3)
        .any(|w| query_cleaned.contains(&w.iter().collect::<String>()))
}
