//! Subprocess boundary for everything the hooks and installer shell out to.
//!
//! Every external tool is an optional collaborator: a missing binary, a
//! non-zero exit, or a timeout means "feature unavailable", never a failure
//! of the calling hook.

use std::collections::BTreeSet;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// How long a liveness probe may block the hook.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// A single subprocess invocation.
#[derive(Debug, Clone, Default)]
pub struct Invocation<'a> {
    pub program: &'a str,
    pub args: Vec<String>,
    pub cwd: Option<&'a Path>,
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    /// Inherit the terminal instead of capturing output (installer steps the
    /// user should see).
    pub interactive: bool,
}

impl<'a> Invocation<'a> {
    pub fn new<S: AsRef<str>>(program: &'a str, args: &[S]) -> Self {
        Self {
            program,
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn cwd(mut self, dir: &'a Path) -> Self {
        self.cwd = Some(dir);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    /// Command line as typed in a shell, for messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs external commands. Hooks and the installer take `&dyn CommandRunner`
/// so tests can script every subprocess.
pub trait CommandRunner {
    /// Whether `program` resolves on PATH.
    fn exists(&self, program: &str) -> bool;

    /// Run to completion. `Err` for spawn failures and timeouts.
    fn run(&self, invocation: &Invocation<'_>) -> io::Result<CommandOutput>;
}

/// The real runner.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    fn run(&self, invocation: &Invocation<'_>) -> io::Result<CommandOutput> {
        let mut cmd = Command::new(invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = invocation.cwd {
            cmd.current_dir(dir);
        }
        for (k, v) in &invocation.env {
            cmd.env(k, v);
        }
        if invocation.interactive {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        }

        let mut child = cmd.spawn()?;
        // Drain both pipes while waiting so a chatty child can't fill them
        // and stall until the timeout.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match invocation.timeout {
            Some(limit) => match child.wait_timeout(limit)? {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("{} timed out after {:?}", invocation.display(), limit),
                    ));
                }
            },
            None => child.wait()?,
        };

        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;
        Ok(CommandOutput {
            success: status.success(),
            stdout,
            stderr,
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<String>> {
    thread::spawn(move || {
        let mut buf = String::new();
        pipe.read_to_string(&mut buf)?;
        Ok(buf)
    })
}

fn collect(reader: Option<JoinHandle<io::Result<String>>>) -> io::Result<String> {
    match reader {
        Some(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("output reader panicked"))),
        None => Ok(String::new()),
    }
}

// ===================================================================
// MCP server registry (`claude mcp list`)
// ===================================================================

/// Known MCP servers, keyed the way `sessions-config.json` names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum McpServer {
    Serena,
    MemoryBank,
    Github,
    Storybook,
    Playwright,
}

impl McpServer {
    /// Classify one line of `claude mcp list` output.
    fn from_list_line(line: &str) -> Option<Self> {
        let line = line.to_lowercase();
        if line.contains("serena:") {
            Some(Self::Serena)
        } else if line.contains("memory-bank") || line.contains("memorybank") {
            Some(Self::MemoryBank)
        } else if line.contains("github-mcp") || line.contains("github_mcp") {
            Some(Self::Github)
        } else if line.contains("storybook") {
            Some(Self::Storybook)
        } else if line.contains("playwright") {
            Some(Self::Playwright)
        } else {
            None
        }
    }
}

/// Run `claude mcp list`, bounded by [`PROBE_TIMEOUT`]. `None` when the CLI
/// is missing, fails, or hangs.
fn mcp_list(runner: &dyn CommandRunner) -> Option<String> {
    let invocation = Invocation::new("claude", &["mcp", "list"]).timeout(PROBE_TIMEOUT);
    match runner.run(&invocation) {
        Ok(out) if out.success => Some(out.stdout),
        Ok(out) => {
            tracing::warn!(stderr = %out.stderr.trim(), "`claude mcp list` failed");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "`claude mcp list` unavailable");
            None
        }
    }
}

/// Servers already registered with the host.
pub fn installed_mcp_servers(runner: &dyn CommandRunner) -> BTreeSet<McpServer> {
    mcp_list(runner)
        .map(|out| out.lines().filter_map(McpServer::from_list_line).collect())
        .unwrap_or_default()
}

/// Liveness probe for the external memory service.
pub fn memory_bank_available(runner: &dyn CommandRunner) -> bool {
    mcp_list(runner).is_some_and(|out| out.to_lowercase().contains("memory-bank"))
}

#[cfg(test)]
pub mod testing;
