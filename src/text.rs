//! Character-level text utilities shared by the index, the matcher, and the
//! merge walk.
//!
//! The corpus language has no reliable word-boundary delimiters, so keyword
//! extraction works on fixed-width character runs rather than whitespace
//! tokens: all contiguous trigrams first, then bigrams, over the
//! punctuation-stripped text. Trigrams give precision; bigrams catch short
//! terms the trigrams would miss.

use std::collections::HashSet;

/// Punctuation stripped before indexing and matching. Full-width sentence
/// marks, the common Chinese bracket styles, and both paren widths.
const PUNCTUATION: &[char] = &[
    '，', '。', '！', '？', '；', '：', '、', '《', '》', '「', '」', '『', '』', '【', '】',
    '〔', '〕', '〈', '〉', '(', ')', '（', '）',
];

/// Brackets that can open a quoted run; used to drop a leading preamble when
/// re-locating a matched passage inside its page.
const OPENING_BRACKETS: &[char] = &['「', '『', '《', '〈', '【', '〔', '（', '('];

/// Remove punctuation and whitespace, keeping everything else.
pub fn strip_punctuation(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !PUNCTUATION.contains(c))
        .collect()
}

/// Extract index keywords: every contiguous 3-character substring of the
/// cleaned text, then every 2-character substring, de-duplicated within this
/// text (not globally), in that length order.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let cleaned: Vec<char> = strip_punctuation(text).chars().collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut keywords = Vec::new();

    for len in [3usize, 2] {
        for window in cleaned.windows(len) {
            let keyword: String = window.iter().collect();
            if seen.insert(keyword.clone()) {
                keywords.push(keyword);
            }
        }
    }

    keywords
}

/// Character-Jaccard similarity: |shared unique characters| over
/// |union of unique characters|. Zero when either string is empty.
pub fn char_jaccard(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let set_a: HashSet<char> = a.chars().collect();
    let set_b: HashSet<char> = b.chars().collect();
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

/// Share of `text`'s characters that also occur anywhere in `other`.
/// Unlike [`char_jaccard`] this counts every occurrence in `text`, so it is
/// proportional to passage length rather than unique-character overlap.
pub fn containment_ratio(text: &str, other: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let other_set: HashSet<char> = other.chars().collect();
    let shared = text.chars().filter(|c| other_set.contains(c)).count();
    shared as f64 / total as f64
}

/// Map the quotation families 『』, “”, and ‘’ onto the canonical 「」 pair.
///
/// Lossy by construction: genuinely different quotation styles collapse to
/// one, which can over-match passages that quote at different nesting depths.
/// Accepted as a heuristic, not a guarantee.
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '『' | '“' | '‘' => '「',
            '』' | '”' | '’' => '」',
            other => other,
        })
        .collect()
}

/// Drop a leading run of non-bracket characters up to the first opening
/// bracket. Annotated editions often prefix a passage with a section label
/// before the quoted text begins; the label is absent from the index-time
/// representation.
pub fn strip_leading_preamble(text: &str) -> &str {
    match text
        .char_indices()
        .find(|(_, c)| OPENING_BRACKETS.contains(c))
    {
        Some((idx, _)) if idx > 0 => &text[idx..],
        _ => text,
    }
}

/// Byte-safe prefix of at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
