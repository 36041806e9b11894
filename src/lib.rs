//! # Gloss Match
//!
//! An in-memory gloss matcher for annotated classical Chinese texts.
//!
//! Gloss Match loads a corpus of original/explanation passage pairs from a
//! JSON document, builds a substring keyword index over the originals, and
//! resolves free-form selections of source text to their annotated
//! explanations. Selections that span several consecutive passages come back
//! as a single merged gloss, including across page boundaries. Optional
//! generative backends rewrite matched passages into modern prose, outlines,
//! or study questions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌───────────────┐
//! │  Corpus  │──▶│ KeywordIndex  │──▶│    Matcher    │
//! │  (JSON)  │   │ 2/3-char keys │   │ score + rank  │
//! └──────────┘   └───────────────┘   └──────┬────────┘
//!                                           │
//!                        ┌──────────────────┤
//!                        ▼                  ▼
//!                  ┌──────────┐      ┌────────────┐
//!                  │  merge   │      │ GlossService│
//!                  │  walk    │      │  (lookup)   │
//!                  └──────────┘      └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! gloss fetch                          # download and cache the corpus
//! gloss search "學而時習之"             # best single match
//! gloss match "學而時習之，不亦說乎"     # full merged explanation
//! gloss paraphrase "吾日三省吾身"       # modern prose rewrite
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Corpus data types |
//! | [`corpus`] | Corpus fetch, cache, and file loading |
//! | [`text`] | Character-level text utilities |
//! | [`index`] | Substring keyword index |
//! | [`matcher`] | Scoring and ranking |
//! | [`merge`] | Multi-passage merge walk |
//! | [`service`] | Long-lived lookup service |
//! | [`generate`] | Generative backends (Gemini, rules) |

pub mod config;
pub mod corpus;
pub mod generate;
pub mod index;
pub mod matcher;
pub mod merge;
pub mod models;
pub mod service;
pub mod text;
