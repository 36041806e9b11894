//! Long-lived gloss lookup service.
//!
//! Owns the matcher for the lifetime of the process and exposes the two
//! operations callers actually want: an explanation for a chunk of text, and
//! a best-effort autofill for a form field. Construction is explicit; the
//! service starts empty and becomes ready once a corpus is loaded into it.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::MatcherConfig;
use crate::corpus::fetch_corpus;
use crate::matcher::{Candidate, Matcher};
use crate::merge::merge_subsequent;
use crate::models::Corpus;
use crate::text::truncate_chars;

/// A resolved explanation, with the passage metadata callers display
/// alongside it.
#[derive(Debug, Clone)]
pub struct Explanation {
    pub text: String,
    pub original: String,
    pub page_id: String,
    pub title: String,
    pub score: f64,
    /// How many consecutive passages were merged to cover the query.
    pub split_count: usize,
}

/// Gloss lookup over an in-memory corpus. Not ready until [`load`] or
/// [`load_from_url`] has succeeded; every query operation degrades to `None`
/// while unready.
///
/// [`load`]: GlossService::load
/// [`load_from_url`]: GlossService::load_from_url
pub struct GlossService {
    config: MatcherConfig,
    matcher: Option<Matcher>,
}

impl GlossService {
    /// An empty, unready service.
    pub fn new(config: MatcherConfig) -> Self {
        Self {
            config,
            matcher: None,
        }
    }

    /// Adopt a corpus that was loaded elsewhere (a cache file, a test
    /// fixture). Replaces any previous corpus and its index.
    pub fn load(&mut self, corpus: Corpus) {
        info!(
            pages = corpus.pages.len(),
            passages = corpus.passage_count(),
            "corpus loaded"
        );
        self.matcher = Some(Matcher::new(corpus, self.config.clone()));
    }

    /// Fetch the corpus over HTTP and adopt it. Returns whether this load
    /// succeeded; a failed fetch returns false, leaves any previous corpus
    /// in place, and logs the failure rather than propagating it. Check
    /// [`is_ready`] for overall service state.
    ///
    /// [`is_ready`]: GlossService::is_ready
    pub async fn load_from_url(&mut self, url: &str, timeout: Duration) -> bool {
        match fetch_corpus(url, timeout).await {
            Ok(corpus) => {
                self.load(corpus);
                true
            }
            Err(err) => {
                warn!(%url, error = %err, "corpus fetch failed, lookups stay degraded");
                false
            }
        }
    }

    /// Whether a corpus is loaded and queries can return matches.
    pub fn is_ready(&self) -> bool {
        self.matcher.is_some()
    }

    /// Number of passages available for lookup. Zero while unready.
    pub fn passage_count(&self) -> usize {
        self.matcher
            .as_ref()
            .map(|m| m.corpus().passage_count())
            .unwrap_or(0)
    }

    /// Best single match for a query, without merging. `None` while unready
    /// or when nothing clears the acceptance threshold.
    pub fn search(&self, query: &str) -> Option<Candidate> {
        self.matcher.as_ref()?.search(query, 1)
    }

    /// Full explanation for a chunk of text. The first characters of the
    /// text act as the search key; the whole text then drives the merge walk
    /// so multi-passage selections come back as one gloss.
    pub fn get_explanation(&self, text: &str) -> Option<Explanation> {
        let matcher = self.matcher.as_ref()?;
        let key = truncate_chars(text, self.config.search_key_chars);
        let first = matcher.search(key, 1)?;
        let merged = merge_subsequent(matcher.corpus(), text, &first, &self.config);
        debug!(
            page = %first.page_id,
            score = first.score,
            splits = merged.split_count,
            "explanation resolved"
        );
        Some(Explanation {
            text: merged.text,
            original: first.original,
            page_id: first.page_id,
            title: first.title,
            score: first.score,
            split_count: merged.split_count,
        })
    }

    /// Autofill variant of [`get_explanation`]: declines short inputs
    /// outright so stray form noise never triggers a lookup.
    ///
    /// [`get_explanation`]: GlossService::get_explanation
    pub fn autofill_explanation(&self, text: &str) -> Option<Explanation> {
        let trimmed = text.trim();
        if trimmed.chars().count() < self.config.autofill_min_chars {
            return None;
        }
        self.get_explanation(trimmed)
    }
}
