use std::path::Path;

use crate::error::Result;
use crate::models::Dependency;

pub mod archive;

/// An analyzer inspects one file and collects identification evidence for it.
pub trait Analyzer {
    fn inspect(&self, file: &Path) -> Result<Dependency>;
}
