//! End-to-end tests over the library surface: corpus loading from disk,
//! service lifecycle, matching, and multi-passage merging.

use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use gloss_match::config::{load_or_default, MatcherConfig};
use gloss_match::corpus::load_corpus_file;
use gloss_match::matcher::Matcher;
use gloss_match::service::GlossService;

const CORPUS_JSON: &str = r#"[
  {
    "page": 1,
    "title": "學而",
    "items": [
      {
        "original": "子曰：「學而時習之，不亦說乎？",
        "explanation": "孔子說：學了又按時溫習，不也很高興嗎？"
      },
      {
        "original": "有朋自遠方來，不亦樂乎？",
        "explanation": "有朋友從遠方來，不也很快樂嗎？"
      },
      {
        "original": "人不知而不慍，不亦君子乎？」",
        "explanation": "別人不了解自己也不惱怒，不也是君子嗎？"
      }
    ]
  },
  {
    "page": 2,
    "title": "學而",
    "items": [
      {
        "original": "曾子曰：「吾日三省吾身。",
        "explanation": "曾子說：我每天多次反省自己。"
      },
      {
        "original": "為人謀而不忠乎？",
        "explanation": "替人辦事是否盡心竭力了呢？"
      }
    ]
  }
]"#;

fn service_with_corpus() -> GlossService {
    let corpus = serde_json::from_str(CORPUS_JSON).unwrap();
    let mut svc = GlossService::new(MatcherConfig::default());
    svc.load(corpus);
    svc
}

#[test]
fn test_load_corpus_from_cache_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("corpus.json");
    fs::write(&path, CORPUS_JSON).unwrap();

    let corpus = load_corpus_file(&path).unwrap();
    assert_eq!(corpus.pages.len(), 2);
    assert_eq!(corpus.passage_count(), 5);
    assert_eq!(corpus.pages[0].page_id, "1");
}

#[test]
fn test_config_file_overrides_defaults() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("gloss.toml");
    fs::write(
        &path,
        r#"
[corpus]
url = "https://example.com/corpus.json"

[matcher]
accept_threshold = 0.25
"#,
    )
    .unwrap();

    let cfg = load_or_default(&path).unwrap();
    assert_eq!(cfg.corpus.url, "https://example.com/corpus.json");
    assert!((cfg.matcher.accept_threshold - 0.25).abs() < 1e-9);
    // untouched fields keep their defaults
    assert!((cfg.matcher.keyword_weight - 0.6).abs() < 1e-9);
    assert_eq!(cfg.matcher.miss_tolerance, 2);
}

#[test]
fn test_missing_config_file_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let cfg = load_or_default(&tmp.path().join("absent.toml")).unwrap();
    assert!((cfg.matcher.accept_threshold - 0.15).abs() < 1e-9);
    assert!(!cfg.generative.is_enabled());
}

#[test]
fn test_search_ranks_the_quoted_passage_first() {
    let corpus = serde_json::from_str(CORPUS_JSON).unwrap();
    let matcher = Matcher::new(corpus, MatcherConfig::default());
    let candidates = matcher.rank("學而時習之，不亦說乎", 5);
    assert!(!candidates.is_empty());
    assert!(candidates[0].original.contains("學而時習之"));
    assert!(candidates[0].score > 0.15);
}

#[test]
fn test_explanation_for_single_passage() {
    let svc = service_with_corpus();
    let exp = svc.get_explanation("學而時習之，不亦說乎").unwrap();
    assert_eq!(exp.split_count, 1);
    assert_eq!(exp.text, "孔子說：學了又按時溫習，不也很高興嗎？");
}

#[test]
fn test_explanation_merges_consecutive_passages() {
    let svc = service_with_corpus();
    let exp = svc
        .get_explanation(
            "子曰：「學而時習之，不亦說乎？有朋自遠方來，不亦樂乎？人不知而不慍，不亦君子乎？」",
        )
        .unwrap();
    assert_eq!(exp.split_count, 3);
    let parts: Vec<&str> = exp.text.split("\n\n").collect();
    assert_eq!(parts.len(), 3);
    assert!(parts[0].contains("很高興"));
    assert!(parts[1].contains("很快樂"));
    assert!(parts[2].contains("君子"));
}

#[test]
fn test_explanation_merges_across_page_boundary() {
    let svc = service_with_corpus();
    let exp = svc
        .get_explanation("人不知而不慍，不亦君子乎？曾子曰：吾日三省吾身。")
        .unwrap();
    // last passage of page 1 plus the first passage of page 2
    assert_eq!(exp.split_count, 2);
    assert!(exp.text.contains("君子"));
    assert!(exp.text.contains("反省自己"));
}

#[test]
fn test_no_match_for_text_outside_the_corpus() {
    let svc = service_with_corpus();
    assert!(svc.get_explanation("庖丁為文惠君解牛").is_none());
}

#[test]
fn test_autofill_gating_and_success() {
    let svc = service_with_corpus();
    assert!(svc.autofill_explanation("子曰").is_none());
    let exp = svc.autofill_explanation("為人謀而不忠乎").unwrap();
    assert!(exp.text.contains("盡心竭力"));
    assert_eq!(exp.page_id, "2");
}

#[test]
fn test_unready_service_degrades_quietly() {
    let svc = GlossService::new(MatcherConfig::default());
    assert!(!svc.is_ready());
    assert!(svc.get_explanation("學而時習之").is_none());
    assert!(svc.autofill_explanation("學而時習之").is_none());
}

#[tokio::test]
async fn test_unreachable_corpus_url_degrades_quietly() {
    let mut svc = GlossService::new(MatcherConfig::default());
    let loaded = svc
        .load_from_url("http://127.0.0.1:1/corpus.json", Duration::from_millis(200))
        .await;
    assert!(!loaded);
    assert!(!svc.is_ready());
}

#[test]
fn test_repeated_lookups_are_stable() {
    let svc = service_with_corpus();
    let a = svc.get_explanation("吾日三省吾身").unwrap();
    let b = svc.get_explanation("吾日三省吾身").unwrap();
    assert_eq!(a.text, b.text);
    assert_eq!(a.page_id, b.page_id);
}
