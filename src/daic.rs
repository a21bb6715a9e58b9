//! `cc-sessions daic`: flip between discussion and implementation mode.

use anyhow::Result;
use std::path::Path;

use crate::state::{DaicMode, StateStore, check_daic_mode_bool, get_task_state};

pub fn announcement(mode: DaicMode) -> &'static str {
    match mode {
        DaicMode::Discussion => {
            "[DAIC: Discussion Mode] Edit tools are blocked again. Discuss and agree on the next step before implementing."
        }
        DaicMode::Implementation => {
            "[DAIC: Implementation Mode] Edit tools are unlocked. Implement only what was agreed, then run `daic` to return to discussion mode."
        }
    }
}

/// Toggle the mode flag under `project_root` and return the announcement.
pub fn toggle(project_root: &Path) -> Result<&'static str> {
    let mode = StateStore::new(project_root).toggle_mode()?;
    Ok(announcement(mode))
}

pub fn run(status: bool, project_root: &Path) -> Result<()> {
    if status {
        let mode = if check_daic_mode_bool() {
            DaicMode::Discussion
        } else {
            DaicMode::Implementation
        };
        let task = get_task_state();
        println!("mode: {mode}");
        println!("task: {}", task.task_name());
        println!("branch: {}", task.branch_name());
        return Ok(());
    }
    println!("{}", toggle(project_root)?);
    Ok(())
}
