use anyhow::{Context, Result};
use std::path::Path;

/// Short name of the branch HEAD points at, if `path` is inside a repo with
/// a named HEAD.
pub fn current_branch(path: &Path) -> Option<String> {
    let repo = git2::Repository::discover(path).ok()?;
    let head = repo.head().ok()?;
    if !head.is_branch() {
        return None;
    }
    head.shorthand().map(String::from)
}

/// Working tree status as `git status --porcelain` lines (`XY path`),
/// excluding ignored files.
pub fn status_lines(path: &Path) -> Result<Vec<String>> {
    let repo = git2::Repository::discover(path)
        .with_context(|| format!("finding git repo from {}", path.display()))?;
    let mut opts = git2::StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);
    let statuses = repo.statuses(Some(&mut opts)).context("checking git status")?;
    Ok(statuses
        .iter()
        .filter_map(|entry| {
            let path = entry.path()?;
            Some(format!("{} {path}", porcelain_code(entry.status())))
        })
        .collect())
}

fn porcelain_code(status: git2::Status) -> String {
    if status.is_wt_new() && !status.intersects(INDEX_CHANGES) {
        return "??".into();
    }
    let index = if status.is_index_new() {
        'A'
    } else if status.is_index_modified() {
        'M'
    } else if status.is_index_deleted() {
        'D'
    } else if status.is_index_renamed() {
        'R'
    } else if status.is_index_typechange() {
        'T'
    } else {
        ' '
    };
    let worktree = if status.is_wt_modified() {
        'M'
    } else if status.is_wt_deleted() {
        'D'
    } else if status.is_wt_renamed() {
        'R'
    } else if status.is_wt_typechange() {
        'T'
    } else {
        ' '
    };
    format!("{index}{worktree}")
}

const INDEX_CHANGES: git2::Status = git2::Status::INDEX_NEW
    .union(git2::Status::INDEX_MODIFIED)
    .union(git2::Status::INDEX_DELETED)
    .union(git2::Status::INDEX_RENAMED)
    .union(git2::Status::INDEX_TYPECHANGE);
