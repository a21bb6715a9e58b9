use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use super::{ARCHIVE_DIR, VERSIONS_DIR};
use crate::config::GovernanceConfig;

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Copy a governed document into `versions/` before it is modified, then
/// move snapshots beyond `version_history_limit` (at least one) into
/// `archive/`.
///
/// Returns the snapshot path, or `None` when versioning is off, the target
/// lies outside the documents path, or the document doesn't exist yet.
pub fn snapshot_document(
    config: &GovernanceConfig,
    project_root: &Path,
    target: &Path,
    now: DateTime<Local>,
) -> Result<Option<PathBuf>> {
    if !config.enabled || !config.auto_versioning {
        return Ok(None);
    }
    let docs_dir = config.documents_dir(project_root);
    let target = if target.is_absolute() {
        target.to_path_buf()
    } else {
        project_root.join(target)
    };
    let Ok(relative) = target.strip_prefix(&docs_dir) else {
        return Ok(None);
    };
    if relative.starts_with(VERSIONS_DIR) || relative.starts_with(ARCHIVE_DIR) {
        return Ok(None);
    }
    if !target.is_file() {
        return Ok(None);
    }

    let stem = target
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("{} has no usable file name", target.display()))?;
    let ext = target.extension().and_then(|e| e.to_str()).unwrap_or("md");

    let versions_dir = docs_dir.join(VERSIONS_DIR);
    fs::create_dir_all(&versions_dir)
        .with_context(|| format!("creating {}", versions_dir.display()))?;
    let snapshot = versions_dir.join(format!("{stem}_{}.{ext}", now.format(STAMP_FORMAT)));
    fs::copy(&target, &snapshot)
        .with_context(|| format!("copying {} to {}", target.display(), snapshot.display()))?;

    // The snapshot just taken always stays in `versions/`.
    let limit = config.version_history_limit.max(1);
    prune_snapshots(&versions_dir, &docs_dir.join(ARCHIVE_DIR), stem, limit)?;
    Ok(Some(snapshot))
}

/// Whether `name` is `<stem>_<YYYYmmdd_HHMMSS>.<ext>`.
fn is_snapshot_of(name: &str, stem: &str) -> bool {
    let Some(rest) = name.strip_prefix(stem).and_then(|r| r.strip_prefix('_')) else {
        return false;
    };
    let stamp = rest.split_once('.').map_or(rest, |(s, _)| s);
    let bytes = stamp.as_bytes();
    bytes.len() == 15
        && bytes[8] == b'_'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 8 || b.is_ascii_digit())
}

fn prune_snapshots(versions_dir: &Path, archive_dir: &Path, stem: &str, limit: usize) -> Result<()> {
    let mut snapshots: Vec<String> = fs::read_dir(versions_dir)
        .with_context(|| format!("listing {}", versions_dir.display()))?
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| is_snapshot_of(name, stem))
        .collect();
    if snapshots.len() <= limit {
        return Ok(());
    }
    // Timestamps sort lexically, oldest first.
    snapshots.sort();
    fs::create_dir_all(archive_dir)
        .with_context(|| format!("creating {}", archive_dir.display()))?;
    let excess = snapshots.len() - limit;
    for name in &snapshots[..excess] {
        let from = versions_dir.join(name);
        let to = archive_dir.join(name);
        fs::rename(&from, &to)
            .with_context(|| format!("archiving {}", from.display()))?;
        tracing::debug!(snapshot = %name, "archived document version");
    }
    Ok(())
}
