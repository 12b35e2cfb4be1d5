//! Company Registry Enrichment Library
//!
//! This library enriches company numbers with status and active-director
//! information from the UK company registry API, pacing requests to stay
//! under the published quota.
//!
//! # Modules
//!
//! - `core`: Domain logic (pipeline, officer normalization, models, errors).
//! - `integrations`: External service integrations (registry client, rate limiter).
//! - `config`: Configuration management.
//! - `enrichment`: Per-identifier enrichment pipeline.
//! - `errors`: Error handling types.
//! - `models`: Registry wire models and result records.
//! - `officers`: Officer filtering and age derivation.
//! - `rate_limiter`: Fixed-spacing request pacing and cancellation.
//! - `registry_client`: Registry API client with retries.
//! - `spreadsheet`: CSV input and output.

pub mod core;
pub mod integrations;

pub mod config;
pub mod enrichment;
pub mod errors;
pub mod models;
pub mod officers;
pub mod rate_limiter;
pub mod registry_client;
pub mod spreadsheet;
