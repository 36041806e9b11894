//! Corpus document loading.
//!
//! The corpus is fetched once over HTTP at startup, or read from the local
//! cache file written by `gloss fetch`. Load failure is not fatal to the
//! caller — the service degrades to "no automatic matching available".

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::models::Corpus;

/// Fetch the corpus JSON from `url`. One GET, no retries: a missing corpus
/// only disables automatic matching, it does not merit a retry loop.
pub async fn fetch_corpus(url: &str, timeout: Duration) -> Result<Corpus> {
    if url.is_empty() {
        bail!("No corpus URL configured");
    }

    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch corpus from {}", url))?;

    let status = response.status();
    if !status.is_success() {
        bail!("Corpus fetch failed: HTTP {}", status);
    }

    let corpus: Corpus = response
        .json()
        .await
        .context("Failed to parse corpus JSON")?;

    info!(
        pages = corpus.pages.len(),
        passages = corpus.passage_count(),
        "corpus fetched"
    );
    Ok(corpus)
}

/// Read the corpus from a local JSON file.
pub fn load_corpus_file(path: &Path) -> Result<Corpus> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
    let corpus: Corpus = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse corpus file: {}", path.display()))?;
    info!(
        pages = corpus.pages.len(),
        passages = corpus.passage_count(),
        path = %path.display(),
        "corpus loaded from file"
    );
    Ok(corpus)
}

/// Fetch the corpus and write it to the cache path, creating parent
/// directories as needed. Returns the parsed corpus.
pub async fn fetch_to_cache(url: &str, cache_path: &Path, timeout: Duration) -> Result<Corpus> {
    let corpus = fetch_corpus(url, timeout).await?;

    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create cache directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string(&corpus)?;
    std::fs::write(cache_path, json)
        .with_context(|| format!("Failed to write corpus cache: {}", cache_path.display()))?;

    info!(path = %cache_path.display(), "corpus cached");
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_corpus_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"[{"page": 1, "title": "t", "items": [{"original": "a", "explanation": "b"}]}]"#,
        )
        .unwrap();
        let corpus = load_corpus_file(file.path()).unwrap();
        assert_eq!(corpus.pages.len(), 1);
        assert_eq!(corpus.passage_count(), 1);
    }

    #[test]
    fn test_load_corpus_file_missing() {
        assert!(load_corpus_file(Path::new("/nonexistent/corpus.json")).is_err());
    }

    #[test]
    fn test_load_corpus_file_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();
        assert!(load_corpus_file(file.path()).is_err());
    }

    #[test]
    fn test_cache_shape_reparses() {
        let json = r#"[{"page":"1","title":"t","items":[{"original":"a","explanation":"b"}]}]"#;
        let corpus: Corpus = serde_json::from_str(json).unwrap();
        let exported = serde_json::to_string(&corpus).unwrap();
        let reparsed: Corpus = serde_json::from_str(&exported).unwrap();
        assert_eq!(reparsed.pages[0].page_id, "1");
        assert_eq!(reparsed.pages[0].items[0].original, "a");
    }
}
