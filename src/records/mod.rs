//! Markdown snapshots of analysis, implementation and completion events,
//! written under `sessions/memory_bank/<project>/` when the external memory
//! service is reachable.
//!
//! Records are write-once and never re-read by this crate; the directory
//! listing is the history.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use minijinja::{Environment, Value, context};
use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};

use crate::external::{CommandRunner, memory_bank_available};
use crate::governance::ContextData;
use crate::state::{StateStore, TaskState};
use crate::types::ToolCall;

pub const MEMORY_BANK_DIR: &str = "sessions/memory_bank";

const FILE_STAMP: &str = "%Y%m%d_%H%M%S";
const ISO_STAMP: &str = "%Y-%m-%dT%H:%M:%S%.6f";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Context,
    Implementation,
    Completion,
}

impl RecordKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Context => "contexts",
            Self::Implementation => "implementations",
            Self::Completion => "completions",
        }
    }

    fn file_prefix(self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::Implementation => "implementation",
            Self::Completion => "task_completion",
        }
    }

    fn template(self) -> (&'static str, &'static str) {
        match self {
            Self::Context => ("context.md", include_str!("../../templates/context.md.j2")),
            Self::Implementation => (
                "implementation.md",
                include_str!("../../templates/implementation.md.j2"),
            ),
            Self::Completion => ("completion.md", include_str!("../../templates/completion.md.j2")),
        }
    }
}

// ===================================================================
// Implementation outcome
// ===================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImplementationType {
    CodeModification,
    FileCreation,
    NotebookModification,
    Unknown,
}

impl ImplementationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CodeModification => "code_modification",
            Self::FileCreation => "file_creation",
            Self::NotebookModification => "notebook_modification",
            Self::Unknown => "unknown",
        }
    }
}

/// What one implementation tool call changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationOutcome {
    pub tool_used: String,
    pub files_modified: Vec<String>,
    pub implementation_type: ImplementationType,
}

impl ImplementationOutcome {
    pub fn analyze(tool_name: &str, call: &ToolCall) -> Self {
        let implementation_type = match call {
            ToolCall::Edit(_) | ToolCall::MultiEdit(_) => ImplementationType::CodeModification,
            ToolCall::Write(_) => ImplementationType::FileCreation,
            ToolCall::NotebookEdit(_) => ImplementationType::NotebookModification,
            _ => ImplementationType::Unknown,
        };
        match call.target_path() {
            Some(path) => Self {
                tool_used: tool_name.to_string(),
                files_modified: vec![path.to_string()],
                implementation_type,
            },
            None => Self {
                tool_used: tool_name.to_string(),
                files_modified: Vec::new(),
                implementation_type: ImplementationType::Unknown,
            },
        }
    }

    /// Worth recording: at least one file is known to have changed.
    pub fn is_significant(&self) -> bool {
        !self.files_modified.is_empty()
    }
}

// ===================================================================
// Recorder
// ===================================================================

/// Writes records for one project. Every `preserve_*` call is best-effort:
/// `None` means nothing was written, and no error escapes.
///
/// The memory service is probed at most once per recorder.
pub struct Recorder<'a> {
    project_root: &'a Path,
    runner: &'a dyn CommandRunner,
    available: OnceCell<bool>,
}

impl<'a> Recorder<'a> {
    pub fn new(project_root: &'a Path, runner: &'a dyn CommandRunner) -> Self {
        Self {
            project_root,
            runner,
            available: OnceCell::new(),
        }
    }

    fn service_available(&self) -> bool {
        *self
            .available
            .get_or_init(|| memory_bank_available(self.runner))
    }

    fn project_name(&self) -> String {
        self.project_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".into())
    }

    /// `<root>/sessions/memory_bank/<project>/<kind dir>/`.
    pub fn kind_dir(&self, kind: RecordKind) -> PathBuf {
        self.project_root
            .join(MEMORY_BANK_DIR)
            .join(self.project_name())
            .join(kind.dir_name())
    }

    pub fn preserve_context(&self, data: &ContextData, now: DateTime<Local>) -> Option<PathBuf> {
        self.preserve(RecordKind::Context, now, |task, generated| {
            context! {
                task => task.task_name(),
                branch => task.branch_name(),
                generated,
                summary => data.summary,
                plan => data.plan,
                findings => data.findings,
                dependencies => data.dependencies,
                risks => data.risks,
            }
        })
    }

    pub fn preserve_implementation(
        &self,
        outcome: &ImplementationOutcome,
        now: DateTime<Local>,
    ) -> Option<PathBuf> {
        self.preserve(RecordKind::Implementation, now, |task, generated| {
            context! {
                task => task.task_name(),
                branch => task.branch_name(),
                generated,
                tool => outcome.tool_used,
                implementation_type => outcome.implementation_type.as_str(),
                files => outcome.files_modified,
                significant => outcome.is_significant(),
            }
        })
    }

    pub fn preserve_completion(&self, now: DateTime<Local>) -> Option<PathBuf> {
        self.preserve(RecordKind::Completion, now, |task, generated| {
            let git_status = crate::git::status_lines(self.project_root).unwrap_or_else(|e| {
                tracing::debug!(error = %e, "no git status for completion record");
                vec!["Could not determine git status".into()]
            });
            context! {
                task => task.task_name(),
                branch => task.branch_name(),
                generated,
                git_status,
                services => task.services,
            }
        })
    }

    /// Render and write one record. `build` only runs once the memory bank
    /// is known to be reachable.
    fn preserve(
        &self,
        kind: RecordKind,
        now: DateTime<Local>,
        build: impl FnOnce(&TaskState, String) -> Value,
    ) -> Option<PathBuf> {
        if !self.service_available() {
            tracing::debug!(kind = ?kind, "memory bank unavailable, skipping record");
            return None;
        }
        let task = StateStore::new(self.project_root).task_state();
        let ctx = build(&task, now.format(ISO_STAMP).to_string());
        match self.write(kind, &task, now, ctx) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(kind = ?kind, "could not preserve record: {e:#}");
                None
            }
        }
    }

    fn write(&self, kind: RecordKind, task: &TaskState, now: DateTime<Local>, ctx: Value) -> Result<PathBuf> {
        let body = render(kind, ctx)?;
        let file_name = format!(
            "{}_{}_{}.md",
            kind.file_prefix(),
            task.task_name().replace(['/', '\\'], "-"),
            now.format(FILE_STAMP)
        );
        let dir = self.kind_dir(kind);
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(file_name);
        fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

fn render(kind: RecordKind, ctx: Value) -> Result<String> {
    let (name, source) = kind.template();
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.add_template(name, source)
        .with_context(|| format!("parsing {name} template"))?;
    env.get_template(name)?
        .render(ctx)
        .with_context(|| format!("rendering {name} template"))
}

#[cfg(test)]
mod tests;
