use std::path::PathBuf;

use crate::evidence::EvidenceCollection;

/// Everything collected about one scanned archive: identity (path and
/// checksums) plus the per-attribute evidence that a later matching stage
/// ranks against the naming dataset.
#[derive(Debug, Clone, Default)]
pub struct Dependency {
    pub file_name: String,
    pub file_path: PathBuf,
    /// MD5 of the raw archive bytes, uppercase hex. Set together with
    /// `sha1sum` or not at all.
    pub md5sum: Option<String>,
    /// SHA1 of the raw archive bytes, uppercase hex.
    pub sha1sum: Option<String>,
    pub vendor_evidence: EvidenceCollection,
    pub title_evidence: EvidenceCollection,
    pub version_evidence: EvidenceCollection,
    /// Registry entries attached by the matching stage.
    pub identifiers: Vec<Identifier>,
}

impl Dependency {
    pub fn new(file_name: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Dependency {
            file_name: file_name.into(),
            file_path: file_path.into(),
            ..Default::default()
        }
    }

    pub fn add_identifier(&mut self, identifier: Identifier) {
        self.identifiers.push(identifier);
    }
}

/// A pointer into an external naming registry (e.g. a CPE entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    kind: String,
    value: String,
    title: Option<String>,
    url: Option<String>,
}

impl Identifier {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Identifier {
            kind: kind.into(),
            value: value.into(),
            title: None,
            url: None,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = Some(url.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_dependency_has_no_checksums() {
        let dep = Dependency::new("foo.jar", "/tmp/foo.jar");
        assert!(dep.md5sum.is_none());
        assert!(dep.sha1sum.is_none());
        assert!(dep.vendor_evidence.is_empty());
    }

    #[test]
    fn test_identifier_setters() {
        let mut id = Identifier::new("cpe", "cpe:/a:apache:struts:2.1.2");
        id.set_title("Apache Struts 2.1.2");
        id.set_url("https://example.org/cpe");
        assert_eq!(id.kind(), "cpe");
        assert_eq!(id.title(), Some("Apache Struts 2.1.2"));
    }
}
