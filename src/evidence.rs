use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Qualitative reliability tier attached to each fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

/// A single provenance-tagged fact about a dependency: where it came from
/// (`source`), what it describes (`name`), and the observed `value`.
///
/// Facts are immutable once constructed. Whether a fact actually fed a
/// downstream identification decision is tracked separately by the owning
/// [`EvidenceCollection`], not by mutating the fact itself.
#[derive(Debug, Clone)]
pub struct Evidence {
    source: String,
    name: String,
    value: String,
    confidence: Confidence,
}

impl Evidence {
    pub fn new(
        source: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
        confidence: Confidence,
    ) -> Self {
        Evidence {
            source: source.into(),
            name: name.into(),
            value: value.into(),
            confidence,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }
}

/// Equality is case-insensitive on source/name/value and exact on confidence.
impl PartialEq for Evidence {
    fn eq(&self, other: &Self) -> bool {
        self.source.eq_ignore_ascii_case(&other.source)
            && self.name.eq_ignore_ascii_case(&other.name)
            && self.value.eq_ignore_ascii_case(&other.value)
            && self.confidence == other.confidence
    }
}

impl Eq for Evidence {}

impl Hash for Evidence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.to_ascii_lowercase().hash(state);
        self.name.to_ascii_lowercase().hash(state);
        self.value.to_ascii_lowercase().hash(state);
        self.confidence.hash(state);
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.source, self.name, self.value)
    }
}

/// Per-attribute aggregate of deduplicated facts plus a set of weighting
/// tokens that bias downstream matching.
///
/// A [`Dependency`](crate::models::Dependency) carries one collection each for
/// vendor, title, and version. Collections only ever grow while analyzers run.
#[derive(Debug, Clone, Default)]
pub struct EvidenceCollection {
    evidence: HashSet<Evidence>,
    weighting: HashSet<String>,
    used: HashSet<Evidence>,
}

impl EvidenceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fact. Empty values are silently ignored; a fact that is
    /// already present under the case-insensitive equality rule is not
    /// inserted twice.
    pub fn add_evidence(
        &mut self,
        source: &str,
        name: &str,
        value: &str,
        confidence: Confidence,
    ) {
        if value.is_empty() {
            return;
        }
        self.evidence
            .insert(Evidence::new(source, name, value, confidence));
    }

    /// Add a token to the bias set. Idempotent per token.
    pub fn add_weighting(&mut self, token: impl Into<String>) {
        self.weighting.insert(token.into());
    }

    /// The weighting tokens collected so far.
    pub fn weighting(&self) -> &HashSet<String> {
        &self.weighting
    }

    pub fn iter(&self) -> impl Iterator<Item = &Evidence> {
        self.evidence.iter()
    }

    pub fn len(&self) -> usize {
        self.evidence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evidence.is_empty()
    }

    /// Whether any stored fact's value contains `needle`, case-insensitively.
    pub fn contains_value(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.evidence
            .iter()
            .any(|e| e.value().to_ascii_lowercase().contains(&needle))
    }

    /// Mark a fact as having contributed to an identification decision.
    /// Maintained by the consuming stage; lets reporting distinguish
    /// collected-but-irrelevant evidence from evidence that fed a decision.
    pub fn mark_used(&mut self, evidence: &Evidence) {
        if self.evidence.contains(evidence) {
            self.used.insert(evidence.clone());
        }
    }

    pub fn is_used(&self, evidence: &Evidence) -> bool {
        self.used.contains(evidence)
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }
}

impl fmt::Display for EvidenceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in &self.evidence {
            write!(f, "{} ", e)?;
        }
        Ok(())
    }
}
