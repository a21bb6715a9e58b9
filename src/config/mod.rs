//! `sessions/sessions-config.json`: one section per feature.
//!
//! Loaded fresh on every hook invocation. Every field carries a serde
//! default, so a missing file, a missing section, or a missing key all fall
//! back to the documented defaults. External features default to disabled.

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::state::write_json_atomic;

pub const CONFIG_PATH: &str = "sessions/sessions-config.json";

const DEFAULT_TRIGGER_PHRASES: &[&str] = &["make it so", "run that", "go ahead", "yert"];
const DEFAULT_BLOCKED_TOOLS: &[&str] = &["Edit", "Write", "MultiEdit", "NotebookEdit"];
const DEFAULT_TASK_PREFIXES: &[&str] = &["h-", "m-", "l-", "?-"];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn yes() -> bool {
    true
}

pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_PATH)
}

/// Deserialize `doc[key]`, keeping `fallback` when the key is absent or has
/// the wrong shape.
fn section<T: DeserializeOwned>(doc: &Map<String, Value>, key: &str, fallback: T) -> T {
    let Some(value) = doc.get(key) else {
        return fallback;
    };
    match T::deserialize(value) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(section = key, error = %e, "ignoring malformed config section");
            fallback
        }
    }
}

/// The whole configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default = "default_developer_name")]
    pub developer_name: String,
    #[serde(default = "default_trigger_phrases")]
    pub trigger_phrases: Vec<String>,
    #[serde(default = "default_blocked_tools")]
    pub blocked_tools: Vec<String>,
    #[serde(default)]
    pub task_detection: Toggle,
    #[serde(default)]
    pub branch_enforcement: Toggle,
    /// `false` means automatic ultrathink is enabled.
    #[serde(default)]
    pub api_mode: bool,
    #[serde(default)]
    pub task_prefixes: TaskPrefixes,
    #[serde(default)]
    pub serena_mcp: SerenaConfig,
    #[serde(default)]
    pub memory_bank_mcp: MemoryBankConfig,
    #[serde(default)]
    pub github_mcp: GithubConfig,
    #[serde(default)]
    pub storybook_mcp: StorybookConfig,
    #[serde(default)]
    pub playwright_mcp: PlaywrightConfig,
    #[serde(default)]
    pub document_governance: GovernanceConfig,
}

fn default_developer_name() -> String {
    "the developer".into()
}

fn default_trigger_phrases() -> Vec<String> {
    strings(DEFAULT_TRIGGER_PHRASES)
}

fn default_blocked_tools() -> Vec<String> {
    strings(DEFAULT_BLOCKED_TOOLS)
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            developer_name: default_developer_name(),
            trigger_phrases: default_trigger_phrases(),
            blocked_tools: default_blocked_tools(),
            task_detection: Toggle::default(),
            branch_enforcement: Toggle::default(),
            api_mode: false,
            task_prefixes: TaskPrefixes::default(),
            serena_mcp: SerenaConfig::default(),
            memory_bank_mcp: MemoryBankConfig::default(),
            github_mcp: GithubConfig::default(),
            storybook_mcp: StorybookConfig::default(),
            playwright_mcp: PlaywrightConfig::default(),
            document_governance: GovernanceConfig::default(),
        }
    }
}

impl SessionsConfig {
    /// Load `sessions/sessions-config.json` under `project_root`.
    ///
    /// Never fails: a missing file yields defaults, and a file that can't be
    /// read or parsed is logged and also yields defaults. Each top-level key
    /// is read on its own, so one bad section only resets that section.
    pub fn load(project_root: &Path) -> Self {
        let path = config_path(project_root);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable config, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(doc)) => Self::from_sections(&doc),
            Ok(_) => {
                tracing::warn!(path = %path.display(), "config is not a JSON object, using defaults");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "malformed config, using defaults");
                Self::default()
            }
        }
    }

    fn from_sections(doc: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        Self {
            developer_name: section(doc, "developer_name", defaults.developer_name),
            trigger_phrases: section(doc, "trigger_phrases", defaults.trigger_phrases),
            blocked_tools: section(doc, "blocked_tools", defaults.blocked_tools),
            task_detection: section(doc, "task_detection", defaults.task_detection),
            branch_enforcement: section(doc, "branch_enforcement", defaults.branch_enforcement),
            api_mode: section(doc, "api_mode", defaults.api_mode),
            task_prefixes: section(doc, "task_prefixes", defaults.task_prefixes),
            serena_mcp: section(doc, "serena_mcp", defaults.serena_mcp),
            memory_bank_mcp: section(doc, "memory_bank_mcp", defaults.memory_bank_mcp),
            github_mcp: section(doc, "github_mcp", defaults.github_mcp),
            storybook_mcp: section(doc, "storybook_mcp", defaults.storybook_mcp),
            playwright_mcp: section(doc, "playwright_mcp", defaults.playwright_mcp),
            document_governance: section(doc, "document_governance", defaults.document_governance),
        }
    }

    pub fn save(&self, project_root: &Path) -> Result<()> {
        write_json_atomic(&config_path(project_root), self)
    }

    pub fn is_blocked(&self, tool_name: &str) -> bool {
        self.blocked_tools.iter().any(|t| t == tool_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggle {
    #[serde(default = "yes")]
    pub enabled: bool,
}

impl Default for Toggle {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPrefixes {
    #[serde(default = "default_task_prefixes")]
    pub priority: Vec<String>,
}

fn default_task_prefixes() -> Vec<String> {
    strings(DEFAULT_TASK_PREFIXES)
}

impl Default for TaskPrefixes {
    fn default() -> Self {
        Self {
            priority: default_task_prefixes(),
        }
    }
}

// ===================================================================
// External integrations
// ===================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerenaConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "yes")]
    pub auto_activate: bool,
}

impl Default for SerenaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_activate: true,
        }
    }
}

/// A markdown file mirrored into the memory bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFile {
    pub path: String,
    #[serde(default = "default_sync_status")]
    pub status: String,
    #[serde(default)]
    pub last_synced: Option<String>,
}

fn default_sync_status() -> String {
    "pending".into()
}

impl SyncFile {
    pub fn pending(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: default_sync_status(),
            last_synced: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBankConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "yes")]
    pub auto_activate: bool,
    #[serde(default)]
    pub memory_bank_root: String,
    #[serde(default)]
    pub sync_files: Vec<SyncFile>,
}

impl Default for MemoryBankConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_activate: true,
            memory_bank_root: String::new(),
            sync_files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "yes")]
    pub auto_activate: bool,
    #[serde(default = "yes")]
    pub requires_pat: bool,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_activate: true,
            requires_pat: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorybookConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "yes")]
    pub auto_activate: bool,
    #[serde(default)]
    pub storybook_url: String,
}

impl Default for StorybookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_activate: true,
            storybook_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaywrightConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "yes")]
    pub auto_activate: bool,
    #[serde(default = "yes")]
    pub browser_automation: bool,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_activate: true,
            browser_automation: true,
        }
    }
}

// ===================================================================
// Document governance
// ===================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "yes")]
    pub auto_context_retention: bool,
    #[serde(default = "yes")]
    pub document_validation: bool,
    #[serde(default = "yes")]
    pub conflict_detection: bool,
    #[serde(default = "yes")]
    pub auto_versioning: bool,
    /// Relative to the project root.
    #[serde(default = "default_documents_path")]
    pub documents_path: String,
    #[serde(default = "default_version_history_limit")]
    pub version_history_limit: usize,
    #[serde(default = "yes")]
    pub require_user_confirmation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prd_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fsd_file: Option<String>,
}

fn default_documents_path() -> String {
    "sessions/documents".into()
}

fn default_version_history_limit() -> usize {
    10
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_context_retention: true,
            document_validation: true,
            conflict_detection: true,
            auto_versioning: true,
            documents_path: default_documents_path(),
            version_history_limit: default_version_history_limit(),
            require_user_confirmation: true,
            prd_file: None,
            fsd_file: None,
        }
    }
}

impl GovernanceConfig {
    pub fn documents_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.documents_path)
    }

    pub fn retention_enabled(&self) -> bool {
        self.enabled && self.auto_context_retention
    }

    pub fn validation_enabled(&self) -> bool {
        self.enabled && self.document_validation
    }
}
