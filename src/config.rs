use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub generative: GenerativeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Where the corpus JSON is fetched from. Empty means fetch is
    /// unavailable and only the local cache can be used.
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            cache_path: default_cache_path(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./data/corpus.json")
}
fn default_fetch_timeout_secs() -> u64 {
    30
}

/// Matcher and merge tuning. Every threshold here is an empirically chosen
/// constant carried over from the reference corpus; they are exposed as
/// config rather than re-derived.
#[derive(Debug, Deserialize, Clone)]
pub struct MatcherConfig {
    /// Weight of the keyword-match count in the candidate score.
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,
    /// Weight of the character-Jaccard similarity in the candidate score.
    #[serde(default = "default_similarity_weight")]
    pub similarity_weight: f64,
    /// Minimum score for the top candidate to count as a match.
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: f64,
    /// Queries shorter than this (trimmed, in characters) are rejected.
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,
    /// `autofill_explanation` declines inputs shorter than this.
    #[serde(default = "default_autofill_min_chars")]
    pub autofill_min_chars: usize,
    /// Long inputs are truncated to this many characters for the search
    /// phase; the merge phase still sees the full text.
    #[serde(default = "default_search_key_chars")]
    pub search_key_chars: usize,
    /// Upper bound on the linear fallback scan when no keyword matches.
    #[serde(default = "default_fallback_scan_limit")]
    pub fallback_scan_limit: usize,
    /// Minimum similarity for a fallback-scan passage to become a candidate.
    #[serde(default = "default_fallback_min_similarity")]
    pub fallback_min_similarity: f64,
    /// Passages at or under this length qualify for the character-overlap
    /// inclusion signal.
    #[serde(default = "default_short_passage_chars")]
    pub short_passage_chars: usize,
    /// Overlap ratio a short passage must exceed to be merged.
    #[serde(default = "default_short_overlap_threshold")]
    pub short_overlap_threshold: f64,
    /// Consecutive non-included passages tolerated before the merge walk
    /// stops.
    #[serde(default = "default_miss_tolerance")]
    pub miss_tolerance: usize,
    /// How many passages of the following page the merge walk may examine.
    #[serde(default = "default_next_page_scan_limit")]
    pub next_page_scan_limit: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            keyword_weight: default_keyword_weight(),
            similarity_weight: default_similarity_weight(),
            accept_threshold: default_accept_threshold(),
            min_query_chars: default_min_query_chars(),
            autofill_min_chars: default_autofill_min_chars(),
            search_key_chars: default_search_key_chars(),
            fallback_scan_limit: default_fallback_scan_limit(),
            fallback_min_similarity: default_fallback_min_similarity(),
            short_passage_chars: default_short_passage_chars(),
            short_overlap_threshold: default_short_overlap_threshold(),
            miss_tolerance: default_miss_tolerance(),
            next_page_scan_limit: default_next_page_scan_limit(),
        }
    }
}

fn default_keyword_weight() -> f64 {
    0.6
}
fn default_similarity_weight() -> f64 {
    0.4
}
fn default_accept_threshold() -> f64 {
    0.15
}
fn default_min_query_chars() -> usize {
    2
}
fn default_autofill_min_chars() -> usize {
    5
}
fn default_search_key_chars() -> usize {
    100
}
fn default_fallback_scan_limit() -> usize {
    200
}
fn default_fallback_min_similarity() -> f64 {
    0.1
}
fn default_short_passage_chars() -> usize {
    20
}
fn default_short_overlap_threshold() -> f64 {
    0.6
}
fn default_miss_tolerance() -> usize {
    2
}
fn default_next_page_scan_limit() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerativeConfig {
    /// `"disabled"`, `"gemini"`, or `"rules"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Override for the generateContent endpoint; derived from `model`
    /// when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_generative_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            endpoint: None,
            timeout_secs: default_generative_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_generative_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    5
}

impl GenerativeConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate matcher weights and thresholds
    if config.matcher.keyword_weight < 0.0 || config.matcher.similarity_weight < 0.0 {
        anyhow::bail!("matcher weights must be >= 0");
    }
    if !(0.0..=1.0).contains(&config.matcher.fallback_min_similarity) {
        anyhow::bail!("matcher.fallback_min_similarity must be in [0.0, 1.0]");
    }
    if !(0.0..=1.0).contains(&config.matcher.short_overlap_threshold) {
        anyhow::bail!("matcher.short_overlap_threshold must be in [0.0, 1.0]");
    }
    if config.matcher.min_query_chars < 1 {
        anyhow::bail!("matcher.min_query_chars must be >= 1");
    }
    if config.matcher.search_key_chars < config.matcher.min_query_chars {
        anyhow::bail!("matcher.search_key_chars must be >= matcher.min_query_chars");
    }

    match config.generative.provider.as_str() {
        "disabled" | "gemini" | "rules" => {}
        other => anyhow::bail!(
            "Unknown generative provider: '{}'. Must be disabled, gemini, or rules.",
            other
        ),
    }

    if config.generative.provider == "gemini" && config.generative.model.is_none() {
        anyhow::bail!("generative.model must be specified when provider is 'gemini'");
    }

    Ok(config)
}

/// Load the config file if it exists; fall back to built-in defaults when it
/// does not. A present-but-invalid file is still an error.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}
