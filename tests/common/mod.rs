#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run the binary with `args` inside `project`, feeding `stdin` and
/// returning (exit code, stdout, stderr). PATH is emptied so no external
/// tool is found.
pub fn run_cli(project: &Path, args: &[&str], stdin: &str) -> (i32, String, String) {
    run_cli_with_env(project, args, stdin, &[])
}

pub fn run_cli_with_env(
    project: &Path,
    args: &[&str],
    stdin: &str,
    env: &[(&str, &Path)],
) -> (i32, String, String) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cc-sessions"));
    cmd.args(args)
        .current_dir(project)
        .env("CLAUDE_PROJECT_DIR", project)
        .env("PATH", "")
        .env_remove("CC_SESSIONS_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in env {
        cmd.env(key, value);
    }
    let mut child = cmd.spawn().expect("failed to spawn binary");

    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();

    let output = child.wait_with_output().unwrap();
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

pub fn hook(project: &Path, name: &str, event: &serde_json::Value) -> (i32, String, String) {
    run_cli(project, &["hook", name], &event.to_string())
}

pub fn write_config(project: &Path, config: &serde_json::Value) {
    let path = project.join("sessions/sessions-config.json");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, config.to_string()).unwrap();
}

pub fn write_mode(project: &Path, discussion: bool) {
    let path = project.join(".claude/state/daic-mode.json");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::json!({ "mode": mode_name(discussion) }).to_string()).unwrap();
}

pub fn read_mode(project: &Path) -> serde_json::Value {
    let text = fs::read_to_string(project.join(".claude/state/daic-mode.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

pub fn mode_name(discussion: bool) -> &'static str {
    if discussion { "discussion" } else { "implementation" }
}

/// Create a temp dir containing a git repo with an initial commit and return it.
/// The `TempDir` must be kept alive for the duration of the test.
pub fn temp_git_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let repo = git2::Repository::init(dir.path()).unwrap();

    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test").unwrap();
    config.set_str("user.email", "test@test.com").unwrap();

    let sig = repo.signature().unwrap();
    let tree_oid = repo.index().unwrap().write_tree().unwrap();
    let tree = repo.find_tree(tree_oid).unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
        .unwrap();

    dir
}
