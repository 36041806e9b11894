//! # Gloss Match CLI (`gloss`)
//!
//! The `gloss` binary is the command-line interface for Gloss Match. It
//! fetches and caches the annotated corpus, resolves selections of classical
//! Chinese text to their glosses, and drives the generative backends.
//!
//! ## Usage
//!
//! ```bash
//! gloss --config ./config/gloss.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `gloss fetch` | Download the corpus and write the local cache |
//! | `gloss search "<query>"` | Rank candidate passages for a query |
//! | `gloss match "<text>"` | Resolve a selection to its merged explanation |
//! | `gloss paraphrase "<text>"` | Rewrite a passage in modern prose |
//! | `gloss outline "<text>"` | Outline a passage's main points |
//! | `gloss questions "<text>"` | Generate comprehension questions |
//!
//! ## Examples
//!
//! ```bash
//! # Download and cache the corpus
//! gloss fetch --config ./config/gloss.toml
//!
//! # Show the top three candidates for a query
//! gloss search "學而時習之" --limit 3
//!
//! # Resolve a multi-passage selection to one merged gloss
//! gloss match "學而時習之，不亦說乎？有朋自遠方來，不亦樂乎？"
//!
//! # Rewrite with the matched gloss as context
//! gloss paraphrase "吾日三省吾身"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use gloss_match::config::{self, Config};
use gloss_match::corpus;
use gloss_match::generate;
use gloss_match::matcher::Matcher;
use gloss_match::models::Corpus;
use gloss_match::service::GlossService;

/// Gloss Match CLI — resolve classical Chinese selections to their annotated
/// explanations.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/gloss.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "gloss",
    about = "Gloss Match — an in-memory gloss matcher for annotated classical Chinese texts",
    version,
    long_about = "Gloss Match loads a corpus of original/explanation passage pairs, indexes \
    the originals by 2- and 3-character substrings, and resolves free-form selections to \
    merged explanations, with optional generative rewriting via Gemini or an offline rules \
    backend."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/gloss.toml`. Corpus, matcher, and generative
    /// settings are read from this file; missing file falls back to
    /// built-in defaults.
    #[arg(long, global = true, default_value = "./config/gloss.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Download the corpus and write the local cache file.
    ///
    /// Fetches `corpus.url` once and stores the JSON at `corpus.cache_path`.
    /// Subsequent commands read the cache and never touch the network.
    Fetch,

    /// Rank candidate passages for a query.
    ///
    /// Prints up to `--limit` scored candidates. Queries shorter than the
    /// configured minimum, or matching nothing above the acceptance
    /// threshold, print no results.
    Search {
        /// The query text.
        query: String,

        /// Maximum number of candidates to print.
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Resolve a selection to its merged explanation.
    ///
    /// Finds the first matching passage, then walks forward merging every
    /// consecutive passage the selection still covers, across page
    /// boundaries when needed.
    Match {
        /// The selected source text.
        text: String,
    },

    /// Rewrite a passage in modern prose.
    ///
    /// Uses the configured generative backend. When the corpus is available
    /// and `--gloss` is not given, the matched explanation is passed to the
    /// model as context. Falls back to the offline rules backend if the
    /// configured provider fails.
    Paraphrase {
        /// The passage to rewrite.
        text: String,

        /// Explanation to pass as context, overriding corpus lookup.
        #[arg(long)]
        gloss: Option<String>,
    },

    /// Outline a passage's main points.
    ///
    /// Requires a real generative provider; the rules backend cannot
    /// produce outlines. When the corpus is available and `--gloss` is not
    /// given, the matched explanation is passed to the model as context.
    Outline {
        /// The passage to outline.
        text: String,

        /// Explanation to pass as context, overriding corpus lookup.
        #[arg(long)]
        gloss: Option<String>,
    },

    /// Generate comprehension questions for a passage.
    ///
    /// The question count scales with passage length, from 3 for short
    /// excerpts up to 10 past a thousand characters. When the corpus is
    /// available and `--gloss` is not given, the matched explanation is
    /// passed to the model as context.
    Questions {
        /// The passage to question.
        text: String,

        /// Explanation to pass as context, overriding corpus lookup.
        #[arg(long)]
        gloss: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Fetch => {
            let corpus = corpus::fetch_to_cache(
                &cfg.corpus.url,
                &cfg.corpus.cache_path,
                Duration::from_secs(cfg.corpus.fetch_timeout_secs),
            )
            .await?;
            println!(
                "Cached {} pages ({} passages) at {}",
                corpus.pages.len(),
                corpus.passage_count(),
                cfg.corpus.cache_path.display()
            );
        }
        Commands::Search { query, limit } => {
            let corpus = load_corpus(&cfg).await?;
            let matcher = Matcher::new(corpus, cfg.matcher.clone());
            let candidates = matcher.rank(&query, limit);
            if candidates.is_empty() {
                println!("No matching passages.");
            }
            for (i, c) in candidates.iter().enumerate() {
                println!(
                    "{}. [{:.3}] {} · {} (page {})",
                    i + 1,
                    c.score,
                    c.original,
                    c.title,
                    c.page_id
                );
            }
        }
        Commands::Match { text } => {
            let mut service = GlossService::new(cfg.matcher.clone());
            service.load(load_corpus(&cfg).await?);
            match service.get_explanation(&text) {
                Some(exp) => {
                    println!("{} (page {})", exp.title, exp.page_id);
                    if exp.split_count > 1 {
                        println!("merged {} passages", exp.split_count);
                    }
                    println!();
                    println!("{}", exp.text);
                }
                None => println!("No matching passage."),
            }
        }
        Commands::Paraphrase { text, gloss } => {
            let gloss = resolve_gloss(&cfg, &text, gloss).await;
            let result = match generate::modernize(&cfg.generative, &text, gloss.as_deref()).await {
                Ok(result) => result,
                Err(err) => {
                    warn!(error = %err, "generative backend failed, using rules fallback");
                    generate::rules_paraphrase(&text)
                }
            };
            println!("{}", result);
        }
        Commands::Outline { text, gloss } => {
            let gloss = resolve_gloss(&cfg, &text, gloss).await;
            println!(
                "{}",
                generate::outline(&cfg.generative, &text, gloss.as_deref()).await?
            );
        }
        Commands::Questions { text, gloss } => {
            let gloss = resolve_gloss(&cfg, &text, gloss).await;
            println!(
                "{}",
                generate::study_questions(&cfg.generative, &text, gloss.as_deref()).await?
            );
        }
    }

    Ok(())
}

/// Load the corpus from the local cache, falling back to a network fetch
/// when no cache exists yet.
async fn load_corpus(cfg: &Config) -> Result<Corpus> {
    if cfg.corpus.cache_path.exists() {
        return corpus::load_corpus_file(&cfg.corpus.cache_path);
    }
    corpus::fetch_to_cache(
        &cfg.corpus.url,
        &cfg.corpus.cache_path,
        Duration::from_secs(cfg.corpus.fetch_timeout_secs),
    )
    .await
}

/// Context for the generative commands: an explicit `--gloss` wins, else a
/// best-effort corpus lookup. Any failure just means the model gets no
/// context.
async fn resolve_gloss(cfg: &Config, text: &str, explicit: Option<String>) -> Option<String> {
    if explicit.is_some() {
        return explicit;
    }
    let corpus = load_corpus(cfg).await.ok()?;
    let mut service = GlossService::new(cfg.matcher.clone());
    service.load(corpus);
    service.autofill_explanation(text).map(|exp| exp.text)
}
