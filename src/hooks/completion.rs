use anyhow::Result;

use super::{HookContext, HookOutcome, proceed};
use crate::types::HookEvent;

const COMPLETION_PHRASES: &[&str] = &[
    "complete the task",
    "finish this task",
    "mark it done",
    "task completion",
    "run task completion",
    "complete task",
];

const GITHUB_WORKFLOW_NOTICE: &str = "\n[GitHub Workflow] GitHub MCP is available for automated PR creation and merge.\n[GitHub Workflow] Consider using GitHub MCP workflow for cleaner merge process.";

pub fn is_completion_request(prompt: &str) -> bool {
    let prompt = prompt.to_lowercase();
    COMPLETION_PHRASES.iter().any(|p| prompt.contains(p))
}

pub fn run(event: &HookEvent, ctx: &HookContext) -> Result<HookOutcome> {
    if !is_completion_request(&event.prompt) {
        return proceed();
    }
    if ctx.config().github_mcp.enabled {
        return Ok(HookOutcome::Advise(GITHUB_WORKFLOW_NOTICE.into()));
    }
    proceed()
}
