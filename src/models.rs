//! Corpus data model.
//!
//! The corpus is a JSON document fetched once at startup: an ordered array of
//! pages, each holding an ordered sequence of original/explanation pairs.
//! Page order matters — the merge walk follows it across page boundaries.

use serde::{Deserialize, Deserializer, Serialize};

/// One original/explanation pair within a page. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Quoted source text, as it appears in the annotated edition.
    #[serde(default)]
    pub original: String,
    /// The annotator's gloss for this passage.
    #[serde(default)]
    pub explanation: String,
}

/// An ordered group of passages; the unit across which cross-page merging
/// operates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Source page identifier. Numeric in some corpus exports, so both
    /// number and string forms are accepted.
    #[serde(rename = "page", deserialize_with = "page_id_string")]
    pub page_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub items: Vec<Passage>,
}

/// The whole annotated corpus: an ordered sequence of pages, read-only after
/// load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Corpus {
    pub pages: Vec<Page>,
}

impl Corpus {
    /// Total number of passages across all pages.
    pub fn passage_count(&self) -> usize {
        self.pages.iter().map(|p| p.items.len()).sum()
    }
}

fn page_id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Text(String),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Num(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}
