use super::*;
use crate::external::testing::ScriptedRunner;
use chrono::TimeZone;
use serde_json::json;

fn at(secs: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 6, 1, 9, 30, secs).unwrap()
}

fn project(task: Option<&str>) -> tempfile::TempDir {
    let dir = tempfile::Builder::new().prefix("shop").tempdir().unwrap();
    if let Some(task) = task {
        StateStore::new(dir.path())
            .save_task_state(&TaskState {
                task: Some(task.into()),
                branch: Some("feature/checkout".into()),
                services: vec!["api".into(), "web".into()],
                updated: None,
            })
            .unwrap();
    }
    dir
}

fn list(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .map(|rd| {
            rd.map(|e| e.unwrap().file_name().into_string().unwrap())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

// =================================================================
// Gating
// =================================================================

#[test]
fn unavailable_service_writes_nothing() {
    let dir = project(Some("m-checkout"));
    let runner = ScriptedRunner::new().respond("claude mcp list", "serena: uvx serena\n");
    let recorder = Recorder::new(dir.path(), &runner);

    let data = ContextData {
        summary: "s".into(),
        plan: "p".into(),
        ..Default::default()
    };
    assert_eq!(recorder.preserve_context(&data, at(0)), None);
    assert!(!dir.path().join(MEMORY_BANK_DIR).exists());
}

#[test]
fn missing_cli_writes_nothing() {
    let dir = project(None);
    let runner = ScriptedRunner::new();
    let recorder = Recorder::new(dir.path(), &runner);
    assert_eq!(recorder.preserve_completion(at(0)), None);
    assert!(!dir.path().join(MEMORY_BANK_DIR).exists());
}

#[test]
fn record_is_not_built_when_service_unavailable() {
    let dir = project(Some("m-checkout"));
    let runner = ScriptedRunner::new();
    let recorder = Recorder::new(dir.path(), &runner);
    let written = recorder.preserve(RecordKind::Completion, at(0), |_, _| {
        panic!("record built without a reachable memory bank")
    });
    assert_eq!(written, None);
}

// =================================================================
// Context records
// =================================================================

#[test]
fn context_record_layout() {
    let dir = project(Some("m-checkout"));
    let runner = ScriptedRunner::with_memory_bank();
    let recorder = Recorder::new(dir.path(), &runner);

    let data = ContextData {
        summary: "Context analysis completed".into(),
        plan: "{\"subagent_type\":\"context-gathering\"}".into(),
        ..Default::default()
    };
    let path = recorder.preserve_context(&data, at(5)).unwrap();

    let project_name = dir.path().file_name().unwrap().to_str().unwrap();
    assert_eq!(
        path,
        dir.path()
            .join("sessions/memory_bank")
            .join(project_name)
            .join("contexts/context_m-checkout_20250601_093005.md")
    );
    let body = fs::read_to_string(&path).unwrap();
    assert!(body.starts_with("# Context Analysis - m-checkout\n"));
    assert!(body.contains("**Branch:** feature/checkout"));
    assert!(body.contains("**Generated:** 2025-06-01T09:30:05.000000"));
    assert!(body.contains("## Implementation Plan\n{\"subagent_type\":\"context-gathering\"}"));
    assert!(body.contains("## Key Findings\nNo findings available"));
    assert!(body.contains("## Risks and Considerations\nNo risks identified"));
}

#[test]
fn unknown_task_when_state_missing() {
    let dir = project(None);
    let runner = ScriptedRunner::with_memory_bank();
    let recorder = Recorder::new(dir.path(), &runner);
    let path = recorder
        .preserve_context(&ContextData::default(), at(0))
        .unwrap();
    assert!(path.ends_with("contexts/context_unknown_20250601_093000.md"));
    let body = fs::read_to_string(path).unwrap();
    assert!(body.contains("**Branch:** unknown"));
    assert!(body.contains("## Analysis Summary\nNo summary available"));
}

#[test]
fn distinct_seconds_give_distinct_files() {
    let dir = project(Some("m-checkout"));
    let runner = ScriptedRunner::with_memory_bank();
    let recorder = Recorder::new(dir.path(), &runner);
    let data = ContextData::default();

    let first = recorder.preserve_context(&data, at(1)).unwrap();
    let second = recorder.preserve_context(&data, at(2)).unwrap();
    assert_ne!(first, second);
    assert_eq!(list(&recorder.kind_dir(RecordKind::Context)).len(), 2);
}

#[test]
fn same_second_overwrites() {
    let dir = project(Some("m-checkout"));
    let runner = ScriptedRunner::with_memory_bank();
    let recorder = Recorder::new(dir.path(), &runner);
    let data = ContextData::default();

    recorder.preserve_context(&data, at(1)).unwrap();
    recorder.preserve_context(&data, at(1)).unwrap();
    assert_eq!(list(&recorder.kind_dir(RecordKind::Context)).len(), 1);
}

// =================================================================
// Implementation records
// =================================================================

#[test]
fn analyze_outcomes() {
    let edit = ToolCall::parse("Edit", &json!({ "file_path": "src/a.rs" }));
    let o = ImplementationOutcome::analyze("Edit", &edit);
    assert_eq!(o.implementation_type, ImplementationType::CodeModification);
    assert_eq!(o.files_modified, vec!["src/a.rs"]);
    assert!(o.is_significant());

    let write = ToolCall::parse("Write", &json!({ "file_path": "new.md", "content": "" }));
    assert_eq!(
        ImplementationOutcome::analyze("Write", &write).implementation_type,
        ImplementationType::FileCreation
    );

    let nb = ToolCall::parse("NotebookEdit", &json!({ "notebook_path": "a.ipynb" }));
    assert_eq!(
        ImplementationOutcome::analyze("NotebookEdit", &nb).implementation_type,
        ImplementationType::NotebookModification
    );

    let pathless = ToolCall::parse("Edit", &json!({}));
    let o = ImplementationOutcome::analyze("Edit", &pathless);
    assert_eq!(o.implementation_type, ImplementationType::Unknown);
    assert!(!o.is_significant());
}

#[test]
fn implementation_record_lists_files() {
    let dir = project(Some("h-login"));
    let runner = ScriptedRunner::with_memory_bank();
    let recorder = Recorder::new(dir.path(), &runner);
    let call = ToolCall::parse("MultiEdit", &json!({ "file_path": "src/login.rs" }));
    let outcome = ImplementationOutcome::analyze("MultiEdit", &call);

    let path = recorder.preserve_implementation(&outcome, at(7)).unwrap();
    assert!(path.ends_with("implementations/implementation_h-login_20250601_093007.md"));
    let body = fs::read_to_string(path).unwrap();
    assert!(body.contains("**Tool Used:** MultiEdit"));
    assert!(body.contains("**Implementation Type:** code_modification"));
    assert!(body.contains("## Files Modified\n- src/login.rs\n"));
    assert!(body.contains("- Significance: High"));
    assert!(body.contains("Current branch: feature/checkout"));
}

// =================================================================
// Completion records
// =================================================================

#[test]
fn completion_record_outside_git() {
    let dir = project(Some("l-docs"));
    let runner = ScriptedRunner::with_memory_bank();
    let recorder = Recorder::new(dir.path(), &runner);

    let path = recorder.preserve_completion(at(9)).unwrap();
    assert!(path.ends_with("completions/task_completion_l-docs_20250601_093009.md"));
    let body = fs::read_to_string(path).unwrap();
    assert!(body.contains("Task l-docs has been completed."));
    assert!(body.contains("## Final Git Status\n- Could not determine git status\n"));
    assert!(body.contains("## Services Modified\n- api\n- web\n"));
}

#[test]
fn completion_record_without_services() {
    let dir = project(None);
    let runner = ScriptedRunner::with_memory_bank();
    let recorder = Recorder::new(dir.path(), &runner);
    let body = fs::read_to_string(recorder.preserve_completion(at(0)).unwrap()).unwrap();
    assert!(body.contains("## Services Modified\nNo services specified\n"));
}

#[test]
fn task_names_with_slashes_stay_in_directory() {
    let dir = project(Some("feature/thing"));
    let runner = ScriptedRunner::with_memory_bank();
    let recorder = Recorder::new(dir.path(), &runner);
    let path = recorder
        .preserve_context(&ContextData::default(), at(0))
        .unwrap();
    assert_eq!(path.parent().unwrap(), recorder.kind_dir(RecordKind::Context));
}

#[test]
fn probe_runs_once_per_recorder() {
    let dir = project(Some("h-login"));
    let runner = ScriptedRunner::with_memory_bank();
    let recorder = Recorder::new(dir.path(), &runner);
    recorder.preserve_context(&ContextData::default(), at(0)).unwrap();
    recorder.preserve_completion(at(1)).unwrap();
    assert_eq!(runner.calls(), vec!["claude mcp list"]);
}
