//! Shared state read and written by every hook: project root resolution, the
//! current task descriptor, and the DAIC mode flag.
//!
//! Files live under `.claude/state/` in the project root. Each is a small JSON
//! document rewritten wholesale; there is no lock, the last writer wins.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const PROJECT_DIR_ENV: &str = "CLAUDE_PROJECT_DIR";
pub const STATE_DIR: &str = ".claude/state";
pub const TASK_STATE_FILE: &str = "current_task.json";
pub const DAIC_MODE_FILE: &str = "daic-mode.json";

/// Directory whose presence marks a project root when searching upward.
const ROOT_MARKER: &str = ".claude";

// ===================================================================
// Project root
// ===================================================================

static PROJECT_ROOT: OnceLock<PathBuf> = OnceLock::new();

/// The project directory for this process. Resolved once; later calls return
/// the same path even if the environment or cwd changes.
pub fn get_project_root() -> &'static Path {
    PROJECT_ROOT.get_or_init(|| {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        resolve_project_root(env::var_os(PROJECT_DIR_ENV), &cwd)
    })
}

/// `CLAUDE_PROJECT_DIR` if set, else the nearest ancestor of `cwd` holding a
/// `.claude/` directory, else `cwd` itself.
pub fn resolve_project_root(env_override: Option<OsString>, cwd: &Path) -> PathBuf {
    if let Some(dir) = env_override.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    cwd.ancestors()
        .find(|dir| dir.join(ROOT_MARKER).is_dir())
        .unwrap_or(cwd)
        .to_path_buf()
}

// ===================================================================
// Documents
// ===================================================================

/// The current task descriptor, `.claude/state/current_task.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskState {
    #[serde(default, deserialize_with = "lenient")]
    pub task: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub branch: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub services: Vec<String>,
    /// Written as `YYYY-MM-DD`. A full timestamp keeps its date part; anything
    /// else reads as absent.
    #[serde(default, deserialize_with = "lenient_date")]
    pub updated: Option<NaiveDate>,
}

/// A field with the wrong shape reads as its default instead of failing the
/// whole document.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Some(text) = value.as_str() else {
        return Ok(None);
    };
    let date = text.get(..10).unwrap_or(text);
    Ok(NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
}

impl TaskState {
    pub fn task_name(&self) -> &str {
        self.task.as_deref().unwrap_or("unknown")
    }

    pub fn branch_name(&self) -> &str {
        self.branch.as_deref().unwrap_or("unknown")
    }
}

/// The discussion/implementation flag that gates edit-class tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaicMode {
    #[default]
    Discussion,
    Implementation,
}

impl DaicMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Discussion => Self::Implementation,
            Self::Implementation => Self::Discussion,
        }
    }
}

impl fmt::Display for DaicMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discussion => f.write_str("discussion"),
            Self::Implementation => f.write_str("implementation"),
        }
    }
}

/// On-disk shape of `daic-mode.json`.
#[derive(Debug, Serialize, Deserialize)]
struct ModeFile {
    mode: DaicMode,
}

/// Outcome of reading a state document. Absence is a normal state
/// ("uninitialized"), distinct from a file that exists but can't be used.
#[derive(Debug, PartialEq, Eq)]
pub enum Loaded<T> {
    Missing,
    Malformed,
    Present(T),
}

impl<T: Default> Loaded<T> {
    pub fn unwrap_or_default(self) -> T {
        match self {
            Loaded::Present(v) => v,
            Loaded::Missing | Loaded::Malformed => T::default(),
        }
    }
}

/// Read and deserialize a JSON file. Never fails: unreadable or unparsable
/// files are logged and reported as `Malformed`.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Loaded<T> {
    match fs::read_to_string(path) {
        Ok(s) => match serde_json::from_str(&s) {
            Ok(v) => Loaded::Present(v),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed state file");
                Loaded::Malformed
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => Loaded::Missing,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read state file");
            Loaded::Malformed
        }
    }
}

/// Serialize `value` as pretty JSON and replace `path` with it in one rename,
/// so readers never observe a partial file.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("{} has no parent directory", path.display()))?;
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, value)
        .with_context(|| format!("serializing {}", path.display()))?;
    tmp.write_all(b"\n")?;
    tmp.persist(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

// ===================================================================
// StateStore
// ===================================================================

/// Typed access to the state files of one project.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(project_root: &Path) -> Self {
        Self {
            dir: project_root.join(STATE_DIR),
        }
    }

    pub fn task_path(&self) -> PathBuf {
        self.dir.join(TASK_STATE_FILE)
    }

    pub fn mode_path(&self) -> PathBuf {
        self.dir.join(DAIC_MODE_FILE)
    }

    pub fn load_task_state(&self) -> Loaded<TaskState> {
        read_json_file(&self.task_path())
    }

    /// The current task, or an empty record when none is stored.
    pub fn task_state(&self) -> TaskState {
        self.load_task_state().unwrap_or_default()
    }

    pub fn save_task_state(&self, state: &TaskState) -> Result<()> {
        write_json_atomic(&self.task_path(), state)
    }

    pub fn load_mode(&self) -> Loaded<DaicMode> {
        match read_json_file::<ModeFile>(&self.mode_path()) {
            Loaded::Present(f) => Loaded::Present(f.mode),
            Loaded::Missing => Loaded::Missing,
            Loaded::Malformed => Loaded::Malformed,
        }
    }

    /// Current mode; anything but a readable implementation flag means
    /// discussion.
    pub fn mode(&self) -> DaicMode {
        self.load_mode().unwrap_or_default()
    }

    pub fn is_discussion(&self) -> bool {
        self.mode() == DaicMode::Discussion
    }

    pub fn set_mode(&self, mode: DaicMode) -> Result<()> {
        write_json_atomic(&self.mode_path(), &ModeFile { mode })
    }

    /// Flip the mode flag and return the new mode.
    pub fn toggle_mode(&self) -> Result<DaicMode> {
        let next = self.mode().toggled();
        self.set_mode(next)?;
        Ok(next)
    }
}

// ===================================================================
// Process-wide accessors
// ===================================================================

pub fn get_task_state() -> TaskState {
    StateStore::new(get_project_root()).task_state()
}

/// True iff the project is in discussion mode (including when no mode has
/// been recorded yet).
pub fn check_daic_mode_bool() -> bool {
    StateStore::new(get_project_root()).is_discussion()
}
