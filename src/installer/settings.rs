//! Hook registrations in `.claude/settings.json`.

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::hooks::HookName;
use crate::state::write_json_atomic;

pub const SETTINGS_PATH: &str = ".claude/settings.json";

#[cfg(windows)]
pub const HOOK_BINARY: &str = "cc-sessions.exe";
#[cfg(not(windows))]
pub const HOOK_BINARY: &str = "cc-sessions";

pub fn settings_path(project_root: &Path) -> PathBuf {
    project_root.join(SETTINGS_PATH)
}

/// Shell command the host runs for `hook`.
pub fn hook_command(hook: HookName) -> String {
    if cfg!(windows) {
        format!("\"%CLAUDE_PROJECT_DIR%\\.claude\\hooks\\{HOOK_BINARY}\" hook {hook}")
    } else {
        format!("$CLAUDE_PROJECT_DIR/.claude/hooks/{HOOK_BINARY} hook {hook}")
    }
}

fn entry(matcher: Option<&str>, hooks: &[HookName]) -> Value {
    let commands: Vec<Value> = hooks
        .iter()
        .map(|h| json!({ "type": "command", "command": hook_command(*h) }))
        .collect();
    match matcher {
        Some(m) => json!({ "matcher": m, "hooks": commands }),
        None => json!({ "hooks": commands }),
    }
}

/// The registration block, keyed by host event.
pub fn session_hooks() -> Map<String, Value> {
    let mut hooks = Map::new();
    hooks.insert(
        "UserPromptSubmit".into(),
        json!([entry(None, &[HookName::UserMessages, HookName::TaskCompletionWorkflow])]),
    );
    hooks.insert(
        "PreToolUse".into(),
        json!([
            entry(Some("Write|Edit|MultiEdit|Task|Bash"), &[HookName::SessionsEnforce]),
            entry(
                Some("Write|Edit|MultiEdit|NotebookEdit|Task"),
                &[HookName::DocumentGovernance]
            ),
        ]),
    );
    hooks.insert(
        "PostToolUse".into(),
        json!([entry(None, &[HookName::PostImplementationRetention])]),
    );
    hooks
}

/// Append the session hooks to whatever `settings` already registers.
///
/// Existing entries are kept and new ones go after them, so running the
/// installer twice registers every hook twice.
pub fn merge_hooks(settings: Value) -> Value {
    let mut settings = match settings {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let hooks = settings
        .entry("hooks")
        .or_insert_with(|| Value::Object(Map::new()));
    if !hooks.is_object() {
        *hooks = Value::Object(Map::new());
    }
    if let Value::Object(hooks) = hooks {
        for (event, additions) in session_hooks() {
            let Value::Array(additions) = additions else {
                continue;
            };
            match hooks.get_mut(&event) {
                Some(Value::Array(existing)) => existing.extend(additions),
                _ => {
                    hooks.insert(event, Value::Array(additions));
                }
            }
        }
    }
    Value::Object(settings)
}

/// Read the existing settings, treating a missing or malformed file as `{}`.
fn read_settings(path: &Path) -> Result<Value> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(serde_json::from_str(&s).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "replacing malformed settings");
            Value::Object(Map::new())
        })),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Value::Object(Map::new())),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

/// Merge the session hooks into `.claude/settings.json`. Returns whether
/// the file existed before.
pub fn update_settings(project_root: &Path) -> Result<bool> {
    let path = settings_path(project_root);
    let existed = path.exists();
    let merged = merge_hooks(read_settings(&path)?);
    write_json_atomic(&path, &merged)?;
    Ok(existed)
}
