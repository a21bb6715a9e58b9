use anyhow::Result;
use std::path::Path;

use super::{HookContext, HookOutcome, proceed};
use crate::git;
use crate::types::{HookEvent, HookOutput, is_implementation_tool};

fn deny(reason: String) -> Result<HookOutcome> {
    Ok(HookOutcome::Proceed(Some(HookOutput::deny_tool(reason))))
}

pub fn run(event: &HookEvent, ctx: &HookContext) -> Result<HookOutcome> {
    let config = ctx.config();
    let store = ctx.store();

    if store.is_discussion() && config.is_blocked(&event.tool_name) {
        let phrases = config
            .trigger_phrases
            .iter()
            .map(|p| format!("\"{p}\""))
            .collect::<Vec<_>>()
            .join(", ");
        return deny(format!(
            "[DAIC: Tool Blocked] You're in discussion mode. The {} tool is not allowed. \
             Discuss the approach with {} and wait for one of the trigger phrases ({phrases}) \
             before implementing.",
            event.tool_name, config.developer_name
        ));
    }

    if config.branch_enforcement.enabled && is_implementation_tool(&event.tool_name) {
        let task = store.task_state();
        let call = event.tool_call();
        if let (Some(expected), Some(target)) = (task.branch.as_deref(), call.target_path()) {
            if let Some(actual) = branch_for_target(ctx.project_root, Path::new(target)) {
                if actual != expected {
                    return deny(format!(
                        "[Branch Mismatch] Task {} expects branch `{expected}`, but the \
                         repository is on `{actual}`. Check out `{expected}` before editing.",
                        task.task_name()
                    ));
                }
            }
        }
    }

    proceed()
}

/// Current branch of the project repo, when `target` lies inside the project.
fn branch_for_target(project_root: &Path, target: &Path) -> Option<String> {
    let target = if target.is_absolute() {
        target.to_path_buf()
    } else {
        project_root.join(target)
    };
    if !target.starts_with(project_root) {
        return None;
    }
    git::current_branch(project_root)
}
