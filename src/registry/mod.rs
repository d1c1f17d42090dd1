//! Remote side of the naming dataset: the transport and import collaborators
//! and the cached-refresh protocol built on top of them.

use std::path::Path;

use crate::error::Result;

pub mod downloader;
pub mod refresher;

/// Transport collaborator: fetch a remote resource to a local path.
///
/// Fails with [`Error::Transport`](crate::error::Error::Transport) on any
/// network or HTTP failure.
pub trait Downloader {
    fn fetch_file(&self, url: &str, destination: &Path, use_proxy: bool) -> Result<()>;
}

/// Import collaborator: load a downloaded dataset export into the local
/// naming index. Fails with
/// [`Error::MalformedData`](crate::error::Error::MalformedData) on malformed
/// input.
pub trait DatasetImporter {
    fn import(&mut self, path: &Path) -> Result<()>;
}
