use super::*;
use std::path::PathBuf;

fn docs(entries: &[(DocumentKind, &str)]) -> DocumentSet {
    let mut set = DocumentSet::new();
    for (kind, text) in entries {
        set.entry(*kind).or_default().push(text.to_string());
    }
    set
}

fn enabled() -> GovernanceConfig {
    GovernanceConfig {
        enabled: true,
        ..Default::default()
    }
}

fn project_with_docs(files: &[(&str, &str)]) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let docs_dir = dir.path().join("sessions/documents");
    fs::create_dir_all(&docs_dir).unwrap();
    for (name, text) in files {
        let path = docs_dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }
    (dir, docs_dir)
}

// =================================================================
// KeywordPolicy
// =================================================================

#[test]
fn flags_restriction_sharing_a_token() {
    let set = docs(&[(DocumentKind::Prd, "You must not refactor the payment module.")]);
    let conflicts = KeywordPolicy.detect("update payment retries", &set);
    assert_eq!(
        conflicts,
        vec![Conflict {
            document_type: DocumentKind::Prd,
            document_index: 0,
            conflict_type: "restriction_violation",
            indicator: "must not",
            description: "Proposed changes may violate PRD restrictions".into(),
        }]
    );
}

#[test]
fn no_shared_tokens_means_no_conflict() {
    let set = docs(&[(DocumentKind::Fsd, "Legacy exports are deprecated.")]);
    assert!(KeywordPolicy.detect("tweak button colors", &set).is_empty());
}

#[test]
fn no_indicator_means_no_conflict() {
    let set = docs(&[(DocumentKind::Prd, "The payment module handles refunds.")]);
    assert!(KeywordPolicy.detect("payment", &set).is_empty());
}

#[test]
fn matching_is_case_insensitive() {
    let set = docs(&[(DocumentKind::Epic, "Direct DB access is FORBIDDEN in Handlers")]);
    let conflicts = KeywordPolicy.detect("Add new handlers", &set);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].indicator, "forbidden");
}

#[test]
fn one_conflict_per_document_naming_first_indicator() {
    // "prohibited" precedes "must not" in the indicator list.
    let set = docs(&[(
        DocumentKind::Prd,
        "Teams must not ship on Fridays. Hotfixes are prohibited too.",
    )]);
    let conflicts = KeywordPolicy.detect("ship the release", &set);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].indicator, "prohibited");
}

#[test]
fn indexes_documents_within_kind() {
    let set = docs(&[
        (DocumentKind::Prd, "Nothing restrictive about search."),
        (DocumentKind::Prd, "Search cannot call the billing API."),
        (DocumentKind::Epic, "Search shall not block."),
    ]);
    let conflicts = KeywordPolicy.detect("search", &set);
    let found: Vec<_> = conflicts
        .iter()
        .map(|c| (c.document_type, c.document_index, c.indicator))
        .collect();
    assert_eq!(
        found,
        vec![
            (DocumentKind::Prd, 1, "cannot"),
            (DocumentKind::Epic, 0, "shall not"),
        ]
    );
}

// =================================================================
// Document discovery
// =================================================================

#[test]
fn kind_from_file_name() {
    assert_eq!(DocumentKind::from_file_name("PRD.md"), Some(DocumentKind::Prd));
    assert_eq!(DocumentKind::from_file_name("FSD-checkout.md"), Some(DocumentKind::Fsd));
    assert_eq!(DocumentKind::from_file_name("EPIC_42.md"), Some(DocumentKind::Epic));
    assert_eq!(DocumentKind::from_file_name("prd.md"), None);
    assert_eq!(DocumentKind::from_file_name("PRD.txt"), None);
    assert_eq!(DocumentKind::from_file_name("README.md"), None);
}

#[test]
fn loads_nested_documents_and_skips_history() {
    let (_dir, docs_dir) = project_with_docs(&[
        ("PRD-a.md", "a"),
        ("team/PRD-b.md", "b"),
        ("FSD.md", "f"),
        ("notes.md", "ignored"),
        ("versions/PRD-a_20250101_000000.md", "old"),
        ("archive/EPIC_20240101_000000.md", "older"),
    ]);
    let set = load_project_documents(&docs_dir);
    assert_eq!(set.get(&DocumentKind::Prd).unwrap(), &vec!["a", "b"]);
    assert_eq!(set.get(&DocumentKind::Fsd).unwrap(), &vec!["f"]);
    assert!(!set.contains_key(&DocumentKind::Epic));
}

#[test]
fn missing_documents_dir_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_project_documents(&dir.path().join("nope")).is_empty());
}

// =================================================================
// validate_against_documents
// =================================================================

fn context(plan: &str) -> ContextData {
    ContextData {
        summary: "Context analysis completed".into(),
        plan: plan.into(),
        ..Default::default()
    }
}

#[test]
fn disabled_governance_always_passes() {
    let (dir, _) = project_with_docs(&[("PRD.md", "You must not refactor the payment module")]);
    let v = validate_against_documents(
        &GovernanceConfig::default(),
        dir.path(),
        &context("refactor payment"),
        &KeywordPolicy,
    );
    assert_eq!(v, Validation::Passed);
}

#[test]
fn validation_or_detection_off_passes() {
    let (dir, _) = project_with_docs(&[("PRD.md", "You must not refactor the payment module")]);
    for config in [
        GovernanceConfig {
            document_validation: false,
            ..enabled()
        },
        GovernanceConfig {
            conflict_detection: false,
            ..enabled()
        },
    ] {
        let v = validate_against_documents(&config, dir.path(), &context("payment"), &KeywordPolicy);
        assert!(v.passed());
    }
}

#[test]
fn no_documents_passes() {
    let (dir, _) = project_with_docs(&[]);
    let v = validate_against_documents(&enabled(), dir.path(), &context("payment"), &KeywordPolicy);
    assert_eq!(v, Validation::Passed);
}

#[test]
fn conflicts_are_unresolved() {
    let (dir, _) = project_with_docs(&[("PRD.md", "You must not refactor the payment module")]);
    for confirm in [true, false] {
        let config = GovernanceConfig {
            require_user_confirmation: confirm,
            ..enabled()
        };
        let v = validate_against_documents(&config, dir.path(), &context("payment"), &KeywordPolicy);
        match v {
            Validation::Unresolved(c) => assert_eq!(c[0].indicator, "must not"),
            other => panic!("Expected Unresolved, got {:?}", other),
        }
    }
}

#[test]
fn custom_documents_path_is_used() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("docs")).unwrap();
    fs::write(dir.path().join("docs/EPIC.md"), "Uploads are restricted to admins").unwrap();
    let config = GovernanceConfig {
        documents_path: "docs".into(),
        ..enabled()
    };
    let v = validate_against_documents(&config, dir.path(), &context("uploads"), &KeywordPolicy);
    assert!(!v.passed());
}

#[test]
fn custom_policy_is_consulted() {
    struct Never;
    impl ConflictPolicy for Never {
        fn detect(&self, _: &str, _: &DocumentSet) -> Vec<Conflict> {
            Vec::new()
        }
    }
    let (dir, _) = project_with_docs(&[("PRD.md", "You must not refactor the payment module")]);
    let v = validate_against_documents(&enabled(), dir.path(), &context("payment"), &Never);
    assert!(v.passed());
}

#[test]
fn report_lists_each_conflict() {
    let set = docs(&[(DocumentKind::Fsd, "Caching is not allowed for auth")]);
    let report = conflict_report(&KeywordPolicy.detect("auth", &set));
    assert!(report.contains("• FSD: Proposed changes may violate FSD restrictions"));
    assert!(report.contains("Indicator: not allowed"));
    assert!(report.contains("3. Abort implementation"));
}
