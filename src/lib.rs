//! # Linknote
//!
//! A local-first bookmark curation pipeline: URLs go in, organized markdown
//! notes come out.
//!
//! Every URL is reduced to a content-addressed fingerprint and walked
//! through a staged pipeline — fetch, readability extraction, domain
//! processing, structured summarization, rendering — with each stage's
//! artifact cached on disk so repeated and resumed runs only pay for what
//! is missing.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────────────┐   ┌──────────┐
//! │  Ingestion   │──▶│         Pipeline           │──▶│  Notes   │
//! │ watch / HTTP │   │ fetch→extract→summarize    │   │ markdown │
//! │   / CLI      │   │   (stage cache + SQLite)   │   │ + media  │
//! └──────────────┘   └───────────────────────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lnk init                                  # create database
//! lnk process https://example.com/article   # one URL → one note
//! lnk watch ./inbox                         # consume capture files
//! lnk serve                                 # HTTP ingestion endpoint
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`fingerprint`] | URL normalization and content addressing |
//! | [`cache`] | Filesystem stage cache |
//! | [`fetch`] | HTTP page retrieval |
//! | [`extract`] | Readability extraction |
//! | [`summarize`] | Structured completion summaries |
//! | [`processor`] | Domain dispatch and note rendering |
//! | [`pipeline`] | Per-bookmark state machine |
//! | [`watcher`] | Capture-directory ingestion |
//! | [`server`] | HTTP ingestion endpoint |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod fingerprint;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod processor;
pub mod processor_arxiv;
pub mod processor_generic;
pub mod processor_twitter;
pub mod processor_youtube;
pub mod records;
pub mod render;
pub mod server;
pub mod summarize;
pub mod watcher;
