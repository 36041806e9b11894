//! Generative text helpers built on top of the gloss lookup.
//!
//! Three operations share one provider abstraction:
//! - [`modernize`] — rewrite a classical passage in plain modern prose
//! - [`outline`] — summarize a passage as a short bulleted outline
//! - [`study_questions`] — derive comprehension questions, scaled to length
//!
//! # Provider Selection
//!
//! The `generative.provider` config field selects the backend:
//! - **`"disabled"`** — every operation returns an error; nothing leaves
//!   the process.
//! - **`"gemini"`** — calls the Gemini `generateContent` API. Requires the
//!   `GEMINI_API_KEY` environment variable.
//! - **`"rules"`** — offline substitution table; only [`modernize`] is
//!   supported, the other operations need a real model.
//!
//! # Retry Strategy
//!
//! The Gemini backend retries transient errors with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use std::time::Duration;
use tracing::debug;

use crate::config::GenerativeConfig;

/// Word-for-word substitutions applied by the offline `"rules"` backend.
/// Ordered longest-first so compound function words win over their parts.
const RULE_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("不亦", "不也"),
    ("何如", "怎麼樣"),
    ("然則", "那麼"),
    ("是以", "因此"),
    ("子曰", "孔子說"),
    ("曰", "說"),
    ("吾", "我"),
    ("汝", "你"),
    ("爾", "你"),
    ("之", "的"),
    ("乎", "嗎"),
    ("矣", "了"),
    ("哉", "啊"),
];

/// Rewrite a classical passage in modern prose. `gloss` is the matched
/// explanation, passed as context when available so the model stays close to
/// the annotated reading.
pub async fn modernize(config: &GenerativeConfig, text: &str, gloss: Option<&str>) -> Result<String> {
    let prompt = modernize_prompt(text, gloss);
    match config.provider.as_str() {
        "gemini" => generate_gemini(config, &prompt).await,
        "rules" => Ok(rules_paraphrase(text)),
        "disabled" => bail!("Generative provider is disabled"),
        other => bail!("Unknown generative provider: {}", other),
    }
}

/// Summarize a passage as a numbered outline of its main points. Like
/// [`modernize`], a matched gloss is folded into the prompt as context.
pub async fn outline(config: &GenerativeConfig, text: &str, gloss: Option<&str>) -> Result<String> {
    let prompt = outline_prompt(text, gloss);
    match config.provider.as_str() {
        "gemini" => generate_gemini(config, &prompt).await,
        "rules" => bail!("The rules backend cannot produce outlines"),
        "disabled" => bail!("Generative provider is disabled"),
        other => bail!("Unknown generative provider: {}", other),
    }
}

/// Produce comprehension questions for a passage. The question count scales
/// with text length, see [`question_count`]; a matched gloss is folded into
/// the prompt as context.
pub async fn study_questions(
    config: &GenerativeConfig,
    text: &str,
    gloss: Option<&str>,
) -> Result<String> {
    let prompt = questions_prompt(text, question_count(text), gloss);
    match config.provider.as_str() {
        "gemini" => generate_gemini(config, &prompt).await,
        "rules" => bail!("The rules backend cannot produce questions"),
        "disabled" => bail!("Generative provider is disabled"),
        other => bail!("Unknown generative provider: {}", other),
    }
}

/// How many study questions a text of this length deserves:
/// 3 for short excerpts, stepping up to 10 past a thousand characters.
pub fn question_count(text: &str) -> usize {
    let len = text.chars().count();
    if len > 1000 {
        10
    } else if len > 500 {
        7
    } else if len > 200 {
        5
    } else {
        3
    }
}

/// Offline fallback: apply the substitution table in order. Crude, but it
/// keeps the paraphrase path alive with no network and no key.
pub fn rules_paraphrase(text: &str) -> String {
    let mut out = text.to_string();
    for (from, to) in RULE_SUBSTITUTIONS {
        out = out.replace(from, to);
    }
    out
}

fn modernize_prompt(text: &str, gloss: Option<&str>) -> String {
    let mut prompt = format!(
        "請將以下文言文改寫成通順的現代白話文，保留原意，不要添加原文沒有的內容。\n\n原文：\n{}",
        text
    );
    push_gloss_context(&mut prompt, gloss);
    prompt.push_str("\n\n只輸出改寫後的白話文。");
    prompt
}

fn outline_prompt(text: &str, gloss: Option<&str>) -> String {
    let mut prompt = format!(
        "請為以下文言文段落整理大綱，列出主要論點，每點一行，以數字編號。\n\n原文：\n{}",
        text
    );
    push_gloss_context(&mut prompt, gloss);
    prompt.push_str("\n\n只輸出大綱。");
    prompt
}

fn questions_prompt(text: &str, count: usize, gloss: Option<&str>) -> String {
    let mut prompt = format!(
        "請根據以下文言文段落，出 {} 道理解問題，每題一行，以數字編號。\n\n原文：\n{}",
        count, text
    );
    push_gloss_context(&mut prompt, gloss);
    prompt.push_str("\n\n只輸出問題。");
    prompt
}

fn push_gloss_context(prompt: &mut String, gloss: Option<&str>) {
    if let Some(gloss) = gloss {
        prompt.push_str(&format!("\n\n可參考的註解：\n{}", gloss));
    }
}

/// Call the Gemini `generateContent` API with retry/backoff.
///
/// Retry strategy:
/// - HTTP 429 or 5xx → retry with exponential backoff
/// - HTTP 4xx (not 429) → fail immediately
/// - Network error → retry
async fn generate_gemini(config: &GenerativeConfig, prompt: &str) -> Result<String> {
    let api_key =
        std::env::var("GEMINI_API_KEY").map_err(|_| anyhow::anyhow!("GEMINI_API_KEY not set"))?;

    let model = config
        .model
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("generative.model required for Gemini provider"))?;

    let endpoint = match &config.endpoint {
        Some(endpoint) => endpoint.clone(),
        None => format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            model
        ),
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "contents": [
            { "parts": [ { "text": prompt } ] }
        ]
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(&endpoint)
            .header("x-goog-api-key", &api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    debug!(%endpoint, "gemini response received");
                    return parse_gemini_response(&json);
                }

                // Rate limited or server error — retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!("Gemini API error {}: {}", status, body_text));
                    continue;
                }

                // Client error (not 429) — don't retry
                let body_text = response.text().await.unwrap_or_default();
                bail!("Gemini API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Generation failed after retries")))
}

/// Parse a Gemini `generateContent` response.
///
/// The usual shape is `candidates[0].content.parts[0].text`; some older
/// deployments put the text at `candidates[0].text` instead, so both are
/// accepted.
fn parse_gemini_response(json: &serde_json::Value) -> Result<String> {
    let candidate = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing candidates"))?;

    let text = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .and_then(|p| p.first())
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .or_else(|| candidate.get("text").and_then(|t| t.as_str()));

    match text {
        Some(text) => Ok(text.trim().to_string()),
        None => bail!("Invalid Gemini response: candidate has no text"),
    }
}
