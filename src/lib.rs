//! # Regional News Ingest
//!
//! Ingests Kentucky regional news: resolves each publisher's feed (or falls
//! back to homepage discovery), extracts clean article text, drops duplicates,
//! tags county and city relevance, summarizes, and inserts one record per
//! canonical URL.
//!
//! ## Architecture
//!
//! 1. **Discovery** ([`scrapers`]): feeds, sitemaps, homepage links
//! 2. **Extraction** ([`extract`]): metadata scrape merged with readability
//! 3. **Deduplication** ([`dedup`]): url hash, title similarity, fingerprint
//! 4. **Classification** ([`geo`], [`classify`]): topic and county relevance
//! 5. **Summarization** ([`summary`]): validated model summary or extractive
//! 6. **Orchestration** ([`pipeline`], [`orchestrator`], [`metrics`])
//!
//! Storage, caching, fetching and the text model are traits ([`store`],
//! [`fetch`], [`api`]), so the core runs against in-memory fakes or real
//! backends.

pub mod api;
pub mod canonical;
pub mod classify;
pub mod config;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod geo;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod outputs;
pub mod pipeline;
pub mod scrapers;
pub mod store;
pub mod summary;
pub mod triggers;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
