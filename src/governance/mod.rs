//! Document governance: checks proposed changes against the project's
//! requirement documents (PRD/FSD/EPIC) and keeps version snapshots of those
//! documents.

mod versions;

pub use versions::snapshot_document;

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::config::GovernanceConfig;

/// Phrases that mark a sentence in a document as a restriction. Checked in
/// this order; the first hit names the conflict.
pub const RESTRICTION_INDICATORS: &[&str] = &[
    "not allowed",
    "forbidden",
    "prohibited",
    "deprecated",
    "must not",
    "cannot",
    "shall not",
    "restricted",
];

/// Subdirectories of the documents path that hold history, not live documents.
pub const VERSIONS_DIR: &str = "versions";
pub const ARCHIVE_DIR: &str = "archive";

// ===================================================================
// Documents
// ===================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocumentKind {
    Prd,
    Fsd,
    Epic,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [Self::Prd, Self::Fsd, Self::Epic];

    pub fn label(self) -> &'static str {
        match self {
            Self::Prd => "PRD",
            Self::Fsd => "FSD",
            Self::Epic => "EPIC",
        }
    }

    /// `PRD*.md`, `FSD*.md`, `EPIC*.md`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        if !name.ends_with(".md") {
            return None;
        }
        Self::ALL.into_iter().find(|k| name.starts_with(k.label()))
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw document texts grouped by kind. Within a kind, documents are ordered
/// by path so `document_index` is stable.
pub type DocumentSet = BTreeMap<DocumentKind, Vec<String>>;

/// Recursively collect PRD/FSD/EPIC markdown files under `docs_dir`. A
/// missing directory yields an empty set; unreadable files are skipped.
pub fn load_project_documents(docs_dir: &Path) -> DocumentSet {
    let mut docs = DocumentSet::new();
    let entries = WalkDir::new(docs_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !(e.file_type().is_dir()
                    && matches!(e.file_name().to_str(), Some(VERSIONS_DIR | ARCHIVE_DIR)))
        })
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file());

    for entry in entries {
        let Some(kind) = entry.file_name().to_str().and_then(DocumentKind::from_file_name) else {
            continue;
        };
        match fs::read_to_string(entry.path()) {
            Ok(text) => docs.entry(kind).or_default().push(text),
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "skipping unreadable document")
            }
        }
    }
    docs
}

// ===================================================================
// Conflict detection
// ===================================================================

/// A possible clash between a proposed change and one document. Produced and
/// consumed within a single validation; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub document_type: DocumentKind,
    pub document_index: usize,
    pub conflict_type: &'static str,
    pub indicator: &'static str,
    pub description: String,
}

/// Strategy for finding conflicts, so a stronger matcher can replace the
/// keyword heuristic without touching callers.
pub trait ConflictPolicy {
    fn detect(&self, proposed: &str, documents: &DocumentSet) -> Vec<Conflict>;
}

/// Bag-of-words heuristic: a document conflicts when it contains a
/// restriction phrase and shares at least one whitespace token with the
/// proposal. Recall-biased; over-flags on common words.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordPolicy;

impl ConflictPolicy for KeywordPolicy {
    fn detect(&self, proposed: &str, documents: &DocumentSet) -> Vec<Conflict> {
        let proposed = proposed.to_lowercase();
        let change_tokens: HashSet<&str> = proposed.split_whitespace().collect();

        let mut conflicts = Vec::new();
        for (&kind, texts) in documents {
            for (index, text) in texts.iter().enumerate() {
                let text = text.to_lowercase();
                let Some(indicator) = RESTRICTION_INDICATORS
                    .iter()
                    .copied()
                    .find(|i| text.contains(i))
                else {
                    continue;
                };
                if text.split_whitespace().any(|t| change_tokens.contains(t)) {
                    conflicts.push(Conflict {
                        document_type: kind,
                        document_index: index,
                        conflict_type: "restriction_violation",
                        indicator,
                        description: format!("Proposed changes may violate {kind} restrictions"),
                    });
                }
            }
        }
        conflicts
    }
}

// ===================================================================
// Validation
// ===================================================================

/// What the analysis phase produced; the plan and summary are what gets
/// checked against the documents.
#[derive(Debug, Clone, Default)]
pub struct ContextData {
    pub summary: String,
    pub plan: String,
    pub findings: Option<String>,
    pub dependencies: Option<String>,
    pub risks: Option<String>,
}

impl ContextData {
    pub fn proposed_changes(&self) -> String {
        format!("{} {}", self.plan, self.summary)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Passed,
    /// Conflicts were found and nobody could confirm them. Advisory only:
    /// the hook has no way to veto the host's tool call.
    Unresolved(Vec<Conflict>),
}

impl Validation {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Check `context` against the documents under the configured path.
///
/// Passes trivially when governance, validation or detection is off, or
/// when there are no documents.
pub fn validate_against_documents(
    config: &GovernanceConfig,
    project_root: &Path,
    context: &ContextData,
    policy: &dyn ConflictPolicy,
) -> Validation {
    if !config.validation_enabled() || !config.conflict_detection {
        return Validation::Passed;
    }

    let documents = load_project_documents(&config.documents_dir(project_root));
    if documents.is_empty() {
        eprintln!("No project documents found for validation.");
        return Validation::Passed;
    }

    let conflicts = policy.detect(&context.proposed_changes(), &documents);
    if conflicts.is_empty() {
        return Validation::Passed;
    }
    if config.require_user_confirmation {
        eprint!("{}", conflict_report(&conflicts));
    }
    Validation::Unresolved(conflicts)
}

/// The alert shown when conflicts need a decision. There is no interactive
/// channel inside a hook, so the options are informational.
pub fn conflict_report(conflicts: &[Conflict]) -> String {
    let mut out = String::from("⚠️  Document Governance Alert: Potential conflicts detected!\n\n");
    for c in conflicts {
        out.push_str(&format!("• {}: {}\n", c.document_type, c.description));
        out.push_str(&format!("  Conflict type: {}\n", c.conflict_type));
        out.push_str(&format!("  Indicator: {}\n\n", c.indicator));
    }
    out.push_str("How would you like to proceed?\n");
    out.push_str("1. Continue with implementation (override conflicts)\n");
    out.push_str("2. Stop and revise documents\n");
    out.push_str("3. Abort implementation\n");
    out
}

#[cfg(test)]
mod tests;
