use serde::{Deserialize, Serialize};

// ===================================================================
// Hook Input (received via stdin, snake_case JSON)
// ===================================================================

/// A single hook event as delivered on stdin.
///
/// Every field is optional: hooks read only what they need and treat the
/// rest as absent, so events from any host version deserialize.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookEvent {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default = "empty_object")]
    pub tool_input: serde_json::Value,
    /// Present on UserPromptSubmit.
    #[serde(default)]
    pub prompt: String,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl HookEvent {
    /// Parse raw stdin. Returns `None` for empty input, non-JSON input, or JSON
    /// that is not an object.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let value: serde_json::Value = serde_json::from_str(raw).ok()?;
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Parse `tool_name` + `tool_input` into a typed `ToolCall`.
    pub fn tool_call(&self) -> ToolCall {
        ToolCall::parse(&self.tool_name, &self.tool_input)
    }

    /// `tool_input` flattened to its JSON text.
    pub fn tool_input_text(&self) -> String {
        self.tool_input.to_string()
    }
}

// ===================================================================
// Tool-Specific Input Types
// ===================================================================

/// Tools that modify files and are gated in discussion mode.
pub const IMPLEMENTATION_TOOLS: &[&str] = &["Edit", "Write", "MultiEdit", "NotebookEdit"];

pub fn is_implementation_tool(tool_name: &str) -> bool {
    IMPLEMENTATION_TOOLS.contains(&tool_name)
}

/// Parsed tool call, matching `tool_name` to a typed `tool_input`.
#[derive(Debug)]
pub enum ToolCall {
    Edit(FileToolInput),
    MultiEdit(FileToolInput),
    Write(FileToolInput),
    NotebookEdit(NotebookEditToolInput),
    Bash(BashToolInput),
    Task(TaskToolInput),
    /// MCP or other unknown tools, or a known tool whose input didn't match.
    Other,
}

impl ToolCall {
    pub fn parse(tool_name: &str, tool_input: &serde_json::Value) -> Self {
        let typed = match tool_name {
            "Edit" => serde_json::from_value(tool_input.clone()).map(Self::Edit),
            "MultiEdit" => serde_json::from_value(tool_input.clone()).map(Self::MultiEdit),
            "Write" => serde_json::from_value(tool_input.clone()).map(Self::Write),
            "NotebookEdit" => serde_json::from_value(tool_input.clone()).map(Self::NotebookEdit),
            "Bash" => serde_json::from_value(tool_input.clone()).map(Self::Bash),
            "Task" => serde_json::from_value(tool_input.clone()).map(Self::Task),
            _ => return Self::Other,
        };
        typed.unwrap_or(Self::Other)
    }

    /// The file an implementation tool targets, if it names one.
    pub fn target_path(&self) -> Option<&str> {
        match self {
            Self::Edit(t) | Self::MultiEdit(t) | Self::Write(t) => {
                Some(t.file_path.as_str()).filter(|p| !p.is_empty())
            }
            Self::NotebookEdit(t) => Some(t.notebook_path.as_str()).filter(|p| !p.is_empty()),
            _ => None,
        }
    }

    /// A Bash call running the `daic` toggle.
    pub fn runs_daic(&self) -> bool {
        match self {
            Self::Bash(t) => t.command.contains("daic"),
            _ => false,
        }
    }

    /// A Task call handed to `agent`, by subagent type or by mention in the
    /// prompt or description.
    pub fn delegates_to(&self, agent: &str) -> bool {
        match self {
            Self::Task(t) => {
                t.subagent_type == agent || t.prompt.contains(agent) || t.description.contains(agent)
            }
            _ => false,
        }
    }
}

/// Shared shape of Edit, MultiEdit and Write inputs; only the path matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct FileToolInput {
    #[serde(default)]
    pub file_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotebookEditToolInput {
    #[serde(default)]
    pub notebook_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BashToolInput {
    pub command: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskToolInput {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subagent_type: String,
}

// ===================================================================
// Hook Output Types (written to stdout as JSON, camelCase)
// ===================================================================

/// Top-level hook output written to stdout on exit code 0.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    /// Warning message shown to the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,

    /// Event-specific output fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

/// Event-specific output, tagged by `hookEventName`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "hookEventName")]
pub enum HookSpecificOutput {
    UserPromptSubmit(UserPromptSubmitOutput),
    PreToolUse(PreToolUseOutput),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPromptSubmitOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

/// PreToolUse permission decision values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreToolUsePermissionDecision {
    Allow,
    Deny,
    Ask,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreToolUseOutput {
    /// `"allow"` bypasses permission, `"deny"` blocks the call, `"ask"` prompts user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_decision: Option<PreToolUsePermissionDecision>,

    /// Reason for the permission decision.
    /// For allow/ask: shown to user. For deny: shown to Claude.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_decision_reason: Option<String>,
}

impl HookOutput {
    pub fn deny_tool(reason: String) -> Self {
        Self {
            hook_specific_output: Some(HookSpecificOutput::PreToolUse(PreToolUseOutput {
                permission_decision: Some(PreToolUsePermissionDecision::Deny),
                permission_decision_reason: Some(reason),
            })),
            ..Default::default()
        }
    }

    pub fn prompt_context(context: String) -> Self {
        Self {
            hook_specific_output: Some(HookSpecificOutput::UserPromptSubmit(
                UserPromptSubmitOutput {
                    additional_context: Some(context),
                },
            )),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests;
