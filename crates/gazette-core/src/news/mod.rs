//! News source client and story ingestor.
//!
//! `NewsClient` speaks the newsdata-style JSON feed; `run_fetch` drives a
//! scheduled ingest run over the configured categories plus a wildcard
//! slot, and `fetch_topic` backs the CLI topic-fetch tool.

mod client;
mod ingest;

pub use client::{NewsClient, NewsPage, RawStory};
pub use ingest::{fetch_topic, run_fetch, FetchSummary};
