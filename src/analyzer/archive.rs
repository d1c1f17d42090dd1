use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::checksum;
use crate::error::{Error, Result};
use crate::evidence::Confidence;
use crate::models::Dependency;

/// Evidence source tag for facts derived from the archive itself.
const SOURCE_ARCHIVE: &str = "archive";
/// Evidence source tag for facts derived from the embedded manifest.
const SOURCE_MANIFEST: &str = "Manifest";

/// The well-known manifest entry of a zip-based package.
const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";

/// Suffix of compiled-class entries considered by the package-path heuristic.
const CLASS_SUFFIX: &str = ".class";

/// Root packages that belong to the managed runtime rather than a vendor.
/// Entries under these contribute nothing to identification.
const RESERVED_ROOTS: &[&str] = &["java", "javax"];

/// Root segments that are grouping conventions, not vendor names.
const GROUP_ROOTS: &[&str] = &["org", "com"];

/// Which evidence collection a manifest attribute feeds.
#[derive(Clone, Copy)]
enum Target {
    Vendor,
    Title,
    Version,
}

/// Manifest attributes worth collecting, with their target collection(s) and
/// confidence.
const MANIFEST_ATTRIBUTES: &[(&str, &[Target], Confidence)] = &[
    ("Implementation-Title", &[Target::Title], Confidence::High),
    ("Implementation-Version", &[Target::Version], Confidence::High),
    ("Implementation-Vendor", &[Target::Vendor], Confidence::High),
    ("Implementation-Vendor-Id", &[Target::Vendor], Confidence::Medium),
    ("Bundle-Description", &[Target::Title], Confidence::Medium),
    ("Bundle-Vendor", &[Target::Vendor], Confidence::Medium),
    ("Bundle-Version", &[Target::Version], Confidence::Medium),
    ("Bundle-Name", &[Target::Title], Confidence::Low),
    ("Main-Class", &[Target::Title, Target::Vendor], Confidence::Medium),
];

/// Ratio a k-segment package prefix must exceed (relative to the eligible
/// class count) before it is emitted. Deeper prefixes are rarer, so the bar
/// drops with depth; depth 1 is unconditional.
const DEPTH_RULES: &[(usize, f32)] = &[(1, 0.0), (2, 0.5), (3, 0.4), (4, 0.3)];

/// Character classes for the filename tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharState {
    Number,
    Alpha,
    Other,
}

fn char_state(c: char) -> CharState {
    if c.is_ascii_digit() || c == '.' {
        CharState::Number
    } else if c.is_ascii_lowercase() {
        CharState::Alpha
    } else {
        CharState::Other
    }
}

/// Collects identification evidence from a zip-based archive: checksums,
/// filename tokens, manifest attributes, and the internal package layout.
///
/// Every step degrades evidence richness instead of failing the scan; the one
/// hard failure is an archive that cannot be read at all.
pub struct ArchiveAnalyzer;

impl ArchiveAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Best-effort checksum step. Either both digests land on the dependency
    /// or neither does.
    fn collect_checksums(&self, dependency: &mut Dependency, file: &Path) {
        match (checksum::md5_checksum(file), checksum::sha1_checksum(file)) {
            (Ok(md5), Ok(sha1)) => {
                dependency.md5sum = Some(md5);
                dependency.sha1sum = Some(sha1);
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("checksums unavailable for {}: {}", file.display(), e);
            }
        }
    }

    /// Reads the main section of the embedded manifest and maps recognized
    /// attributes to evidence. A missing or unreadable manifest is skipped.
    fn parse_manifest(&self, dependency: &mut Dependency, archive: &mut ZipArchive<File>) {
        let mut entry = match archive.by_name(MANIFEST_ENTRY) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("no manifest in {}: {}", dependency.file_name, e);
                return;
            }
        };
        let mut text = String::new();
        if let Err(e) = entry.read_to_string(&mut text) {
            warn!("unreadable manifest in {}: {}", dependency.file_name, e);
            return;
        }
        let attributes = parse_main_attributes(&text);

        for (attr, targets, confidence) in MANIFEST_ATTRIBUTES {
            let Some(value) = attributes.get(*attr) else {
                continue;
            };
            for target in *targets {
                let collection = match target {
                    Target::Vendor => &mut dependency.vendor_evidence,
                    Target::Title => &mut dependency.title_evidence,
                    Target::Version => &mut dependency.version_evidence,
                };
                collection.add_evidence(SOURCE_MANIFEST, attr, value, *confidence);
            }
        }
    }

    /// Frequency analysis of class-file paths. A package prefix shared by a
    /// large fraction of the archive's classes is a reliable signal of the
    /// true package root, hence of the vendor and product.
    fn analyze_package_names(&self, dependency: &mut Dependency, archive: &ZipArchive<File>) {
        let mut frequencies: [HashMap<String, u32>; 4] = Default::default();
        let mut total: u32 = 0;

        for name in archive.file_names() {
            if !name.ends_with(CLASS_SUFFIX) || !name.contains('/') {
                continue;
            }
            let lowered = name.to_lowercase();
            let parts: Vec<&str> = lowered.split('/').collect();
            if RESERVED_ROOTS.contains(&parts[0]) {
                continue;
            }
            total += 1;
            // The last segment is the class file itself; a k-segment prefix
            // only counts when it consists entirely of package directories.
            for depth in 1..=4 {
                if parts.len() > depth {
                    let key = parts[..depth].join("/");
                    *frequencies[depth - 1].entry(key).or_insert(0) += 1;
                }
            }
        }

        if total == 0 {
            return;
        }

        for &(depth, threshold) in DEPTH_RULES {
            for (key, &count) in &frequencies[depth - 1] {
                let parts: Vec<&str> = key.split('/').collect();

                if depth == 1 {
                    // Bare group roots carry no vendor information.
                    if GROUP_ROOTS.contains(&parts[0]) {
                        continue;
                    }
                    self.emit_package_evidence(dependency, &parts, 0..=0, 0..=0);
                    continue;
                }

                let ratio = count as f32 / total as f32;
                if ratio <= threshold {
                    continue;
                }

                // Under a group root the vendor/title windows shift one
                // segment right; at depth 2 the second segment is vendor
                // only, since the root itself names nobody.
                let (vendor_range, title_range) = if GROUP_ROOTS.contains(&parts[0]) {
                    (1..=(depth - 2).max(1), 2..=depth - 1)
                } else {
                    (0..=depth - 2, 1..=depth - 1)
                };
                self.emit_package_evidence(dependency, &parts, vendor_range, title_range);
            }
        }
    }

    fn emit_package_evidence(
        &self,
        dependency: &mut Dependency,
        parts: &[&str],
        vendor_range: std::ops::RangeInclusive<usize>,
        title_range: std::ops::RangeInclusive<usize>,
    ) {
        for i in vendor_range {
            dependency.vendor_evidence.add_weighting(parts[i]);
            dependency.vendor_evidence.add_evidence(
                SOURCE_ARCHIVE,
                "package",
                parts[i],
                Confidence::Low,
            );
        }
        for i in title_range {
            dependency.title_evidence.add_weighting(parts[i]);
            dependency.title_evidence.add_evidence(
                SOURCE_ARCHIVE,
                "package",
                parts[i],
                Confidence::Low,
            );
        }
    }
}

impl Default for ArchiveAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Analyzer for ArchiveAnalyzer {
    fn inspect(&self, file: &Path) -> Result<Dependency> {
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::MalformedData(format!("no file name in {}", file.display())))?
            .to_string();
        let file_path = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
        let mut dependency = Dependency::new(&file_name, file_path);

        // Filename segments are ambiguous across vendor/title/version, so the
        // token string feeds all three; downstream matching disambiguates.
        let tokens = tokenize_file_name(&file_name);
        if !tokens.is_empty() {
            for collection in [
                &mut dependency.vendor_evidence,
                &mut dependency.title_evidence,
                &mut dependency.version_evidence,
            ] {
                collection.add_evidence(SOURCE_ARCHIVE, "file name", &tokens, Confidence::High);
            }
        }

        self.collect_checksums(&mut dependency, file);

        let handle = File::open(file)?;
        let mut archive = ZipArchive::new(handle).map_err(|e| Error::Archive(e.to_string()))?;

        self.parse_manifest(&mut dependency, &mut archive);
        self.analyze_package_names(&mut dependency, &archive);

        Ok(dependency)
    }
}

/// Turn an archive filename into a whitespace-separated token string: strip
/// the trailing extension, lowercase, map `-`/`_` to space, insert a boundary
/// at every character-class transition (digit runs split from letter runs),
/// and collapse repeated whitespace.
fn tokenize_file_name(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(idx) => &file_name[..idx],
        None => file_name,
    };
    let cleaned = stem.to_lowercase().replace(['-', '_'], " ");

    let mut out = String::with_capacity(cleaned.len() + 8);
    let mut state: Option<CharState> = None;
    for c in cleaned.chars() {
        let next = char_state(c);
        if state.is_some_and(|prev| prev != next) {
            out.push(' ');
        }
        state = Some(next);
        out.push(c);
    }

    let collapse = Regex::new(r"\s\s+").expect("static regex");
    collapse.replace_all(&out, " ").trim().to_string()
}

/// Parse the main section of a manifest (everything before the first blank
/// line). Lines beginning with a single space continue the previous value.
fn parse_main_attributes(text: &str) -> HashMap<String, String> {
    let mut attributes: HashMap<String, String> = HashMap::new();
    let mut last_name: Option<String> = None;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            break;
        }
        if let Some(continuation) = line.strip_prefix(' ') {
            if let Some(name) = &last_name {
                if let Some(value) = attributes.get_mut(name) {
                    value.push_str(continuation);
                }
            }
        } else if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_string();
            attributes.insert(name.clone(), value.trim_start().to_string());
            last_name = Some(name);
        }
    }
    attributes
}
