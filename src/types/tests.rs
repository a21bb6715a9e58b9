use super::*;
use serde_json::json;

// =================================================================
// Stdin parsing
// =================================================================

#[test]
fn parse_rejects_empty_and_garbage() {
    assert!(HookEvent::parse("").is_none());
    assert!(HookEvent::parse("   \n").is_none());
    assert!(HookEvent::parse("not json").is_none());
    assert!(HookEvent::parse("[1, 2, 3]").is_none());
    assert!(HookEvent::parse("\"just a string\"").is_none());
}

#[test]
fn parse_accepts_minimal_object() {
    let event = HookEvent::parse("{}").unwrap();
    assert_eq!(event.tool_name, "");
    assert!(event.tool_input.is_object());
    assert_eq!(event.prompt, "");
}

#[test]
fn parse_post_tool_use_write() {
    let raw = json!({
        "session_id": "sess-1",
        "cwd": "/home/user/project",
        "hook_event_name": "PostToolUse",
        "tool_name": "Write",
        "tool_input": { "file_path": "/tmp/out.txt", "content": "hello world" },
        "tool_response": { "success": true }
    })
    .to_string();

    let event = HookEvent::parse(&raw).unwrap();
    assert_eq!(event.tool_name, "Write");
    match event.tool_call() {
        ToolCall::Write(t) => assert_eq!(t.file_path, "/tmp/out.txt"),
        other => panic!("Expected Write, got {:?}", other),
    }
}

#[test]
fn parse_user_prompt_submit() {
    let raw = json!({
        "hook_event_name": "UserPromptSubmit",
        "prompt": "Let's complete the task"
    })
    .to_string();
    let event = HookEvent::parse(&raw).unwrap();
    assert_eq!(event.prompt, "Let's complete the task");
}

// =================================================================
// ToolCall
// =================================================================

#[test]
fn tool_call_target_paths() {
    let edit = ToolCall::parse("Edit", &json!({ "file_path": "src/a.rs", "old_string": "a" }));
    assert_eq!(edit.target_path(), Some("src/a.rs"));

    let nb = ToolCall::parse("NotebookEdit", &json!({ "notebook_path": "n.ipynb" }));
    assert_eq!(nb.target_path(), Some("n.ipynb"));

    let bash = ToolCall::parse("Bash", &json!({ "command": "ls" }));
    assert!(matches!(bash, ToolCall::Bash(_)));
    assert_eq!(bash.target_path(), None);
}

#[test]
fn tool_call_empty_path_is_none() {
    let write = ToolCall::parse("Write", &json!({}));
    assert_eq!(write.target_path(), None);
}

#[test]
fn tool_call_mismatched_input_falls_back_to_other() {
    let bash = ToolCall::parse("Bash", &json!({ "not_command": 1 }));
    assert!(matches!(bash, ToolCall::Other));
    assert!(!bash.runs_daic());
}

#[test]
fn bash_daic_detection() {
    assert!(ToolCall::parse("Bash", &json!({ "command": "daic" })).runs_daic());
    assert!(ToolCall::parse("Bash", &json!({ "command": "./daic --status" })).runs_daic());
    assert!(!ToolCall::parse("Bash", &json!({ "command": "ls", "description": "daic" })).runs_daic());
    assert!(!ToolCall::parse("Read", &json!({ "file_path": "daic.md" })).runs_daic());
}

#[test]
fn task_delegation() {
    let by_type = ToolCall::parse("Task", &json!({ "subagent_type": "context-gathering" }));
    assert!(by_type.delegates_to("context-gathering"));

    let by_prompt = ToolCall::parse(
        "Task",
        &json!({ "subagent_type": "general", "prompt": "use the context-gathering agent" }),
    );
    assert!(by_prompt.delegates_to("context-gathering"));

    let other = ToolCall::parse("Task", &json!({ "subagent_type": "code-review" }));
    assert!(!other.delegates_to("context-gathering"));
    assert!(!ToolCall::parse("Bash", &json!({ "command": "context-gathering" })).delegates_to("context-gathering"));
}

#[test]
fn implementation_tools() {
    for t in ["Edit", "Write", "MultiEdit", "NotebookEdit"] {
        assert!(is_implementation_tool(t));
    }
    for t in ["Bash", "Task", "Read", ""] {
        assert!(!is_implementation_tool(t));
    }
}

// =================================================================
// Output serialization
// =================================================================

#[test]
fn serialize_deny_tool() {
    let out = HookOutput::deny_tool("discuss first".into());
    let v = serde_json::to_value(&out).unwrap();
    assert_eq!(
        v,
        json!({
            "hookSpecificOutput": {
                "hookEventName": "PreToolUse",
                "permissionDecision": "deny",
                "permissionDecisionReason": "discuss first"
            }
        })
    );
}

#[test]
fn serialize_prompt_context() {
    let out = HookOutput::prompt_context("[DAIC] implementation".into());
    let v = serde_json::to_value(&out).unwrap();
    assert_eq!(v["hookSpecificOutput"]["hookEventName"], "UserPromptSubmit");
    assert_eq!(
        v["hookSpecificOutput"]["additionalContext"],
        "[DAIC] implementation"
    );
    assert!(v.get("systemMessage").is_none());
}
