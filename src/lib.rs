//! `depscan` — collect identification evidence from bundled archives and keep
//! a product-naming dataset current.
//!
//! # Flow
//! 1. Load settings ([`config::load_settings`]).
//! 2. Refresh the local naming dataset if the remote copy is newer
//!    ([`registry::refresher::CachedDatasetRefresher`]).
//! 3. Inspect each archive ([`analyzer::archive::ArchiveAnalyzer`]), producing
//!    a [`models::Dependency`] populated with provenance-tagged facts
//!    ([`evidence::Evidence`]) and weighting tokens.
//! 4. Hand the dependency to a matching stage (external) that ranks naming
//!    entries against the collected evidence and attaches
//!    [`models::Identifier`]s.
//!
//! Evidence gathering is best-effort and purely additive: a missing signal
//! only reduces later match confidence, it never aborts a scan.

pub mod analyzer;
pub mod checksum;
pub mod config;
pub mod error;
pub mod evidence;
pub mod models;
pub mod registry;

pub use analyzer::archive::ArchiveAnalyzer;
pub use analyzer::Analyzer;
pub use config::{load_settings, Settings};
pub use error::{Error, Result};
pub use evidence::{Confidence, Evidence, EvidenceCollection};
pub use models::{Dependency, Identifier};
pub use registry::downloader::HttpDownloader;
pub use registry::refresher::CachedDatasetRefresher;
pub use registry::{DatasetImporter, Downloader};
