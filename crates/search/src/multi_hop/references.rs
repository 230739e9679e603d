//! Cross-reference detection for Dutch building regulations
//!
//! Bouwbesluit text cites other provisions as `artikel 4.163`, `art. 4.163`
//! or `tabel 4.162`. Other citation grammars can be plugged in through
//! [`ReferenceDetector`].

use crate::retrieval::RetrievedChunk;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

static ARTICLE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:artikel|art\.)\s*(\d+\.\d+)").unwrap());

static TABLE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btabel\s+(\d+\.\d+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Article,
    Table,
}

/// A cited provision, e.g. table 4.162
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub kind: ReferenceKind,
    pub number: String,
}

impl Reference {
    pub fn article(number: impl Into<String>) -> Self {
        Self {
            kind: ReferenceKind::Article,
            number: number.into(),
        }
    }

    pub fn table(number: impl Into<String>) -> Self {
        Self {
            kind: ReferenceKind::Table,
            number: number.into(),
        }
    }

    /// Retrieval query used to chase the reference
    pub fn query(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ReferenceKind::Article => write!(f, "Artikel {}", self.number),
            ReferenceKind::Table => write!(f, "Tabel {}", self.number),
        }
    }
}

/// Finds references in chunk text and decides when a chunk satisfies one
pub trait ReferenceDetector: Send + Sync {
    /// References in order of first appearance, without duplicates
    fn detect_references(&self, text: &str) -> Vec<Reference>;

    /// True when `chunk` is the referenced provision itself
    fn is_resolved_by(&self, reference: &Reference, chunk: &RetrievedChunk) -> bool;
}

/// Detector for Bouwbesluit article and table citations
#[derive(Debug, Clone, Copy, Default)]
pub struct LegalReferenceDetector;

impl LegalReferenceDetector {
    fn mentions(&self, text: &str, reference: &Reference) -> bool {
        // file names use separators instead of spaces: tabel_4.162.pdf
        let normalized = text.replace(['_', '-'], " ");
        self.detect_references(&normalized).contains(reference)
    }
}

impl ReferenceDetector for LegalReferenceDetector {
    fn detect_references(&self, text: &str) -> Vec<Reference> {
        let mut found: Vec<(usize, Reference)> = ARTICLE_REF
            .captures_iter(text)
            .filter_map(|caps| Some((caps.get(0)?.start(), Reference::article(&caps[1]))))
            .chain(
                TABLE_REF
                    .captures_iter(text)
                    .filter_map(|caps| Some((caps.get(0)?.start(), Reference::table(&caps[1])))),
            )
            .collect();
        found.sort_by_key(|(pos, _)| *pos);

        let mut seen = HashSet::new();
        found
            .into_iter()
            .map(|(_, reference)| reference)
            .filter(|reference| seen.insert(reference.clone()))
            .collect()
    }

    fn is_resolved_by(&self, reference: &Reference, chunk: &RetrievedChunk) -> bool {
        let heading = chunk.text.lines().map(str::trim).find(|l| !l.is_empty());

        chunk
            .section_title
            .as_deref()
            .is_some_and(|title| self.mentions(title, reference))
            || self.mentions(&chunk.source_file, reference)
            || heading.is_some_and(|line| self.mentions(line, reference))
    }
}
