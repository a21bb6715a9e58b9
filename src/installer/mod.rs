//! `cc-sessions install`: set up a project for session hooks.
//!
//! Steps run in order; the first hard error aborts the whole install, while
//! optional pieces (the global `daic` helper, MCP integrations) only warn.

mod integrations;
mod prompt;
mod settings;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use owo_colors::OwoColorize;
use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{SessionsConfig, TaskPrefixes};
use crate::external::{CommandRunner, Invocation, McpServer, SystemRunner, installed_mcp_servers};
use crate::state::{DaicMode, PROJECT_DIR_ENV, StateStore, TaskState};

use prompt::{Prompter, StdinPrompter};
use settings::HOOK_BINARY;

/// Overrides where the `daic` helper is installed.
pub const BIN_DIR_ENV: &str = "CC_SESSIONS_BIN_DIR";

pub const PROJECT_DIRS: &[&str] = &[
    ".claude/hooks",
    ".claude/state",
    ".claude/agents",
    ".claude/commands",
    "sessions/tasks",
    "sessions/tasks/done",
    "sessions/protocols",
    "sessions/documents",
    "sessions/documents/versions",
    "sessions/documents/archive",
    "sessions/knowledge",
];

/// Files shipped inside the binary, keyed by destination under the project.
const BUNDLED_FILES: &[(&str, &str)] = &[
    (
        "sessions/protocols/task-creation.md",
        include_str!("../../assets/protocols/task-creation.md"),
    ),
    (
        "sessions/protocols/task-startup.md",
        include_str!("../../assets/protocols/task-startup.md"),
    ),
    (
        "sessions/protocols/task-completion.md",
        include_str!("../../assets/protocols/task-completion.md"),
    ),
    (
        "sessions/protocols/context-compaction.md",
        include_str!("../../assets/protocols/context-compaction.md"),
    ),
    (
        ".claude/agents/context-gathering.md",
        include_str!("../../assets/agents/context-gathering.md"),
    ),
    (
        ".claude/agents/code-review.md",
        include_str!("../../assets/agents/code-review.md"),
    ),
    (
        ".claude/agents/logging.md",
        include_str!("../../assets/agents/logging.md"),
    ),
    (
        ".claude/commands/add-trigger.md",
        include_str!("../../assets/commands/add-trigger.md"),
    ),
    (
        ".claude/commands/api-mode.md",
        include_str!("../../assets/commands/api-mode.md"),
    ),
    ("sessions/tasks/TEMPLATE.md", include_str!("../../assets/TEMPLATE.md")),
];

/// Tools offered in the blocked-tools menu, with whether they are blocked by
/// default.
pub const TOOL_MENU: &[(&str, &str, bool)] = &[
    ("Edit", "Edit existing files", true),
    ("Write", "Create new files", true),
    ("MultiEdit", "Multiple edits in one operation", true),
    ("NotebookEdit", "Edit Jupyter notebooks", true),
    ("Bash", "Run shell commands", false),
    ("Read", "Read file contents", false),
    ("Grep", "Search file contents", false),
    ("Glob", "Find files by pattern", false),
    ("LS", "List directory contents", false),
    ("WebSearch", "Search the web", false),
    ("WebFetch", "Fetch web content", false),
    ("Task", "Launch specialized agents", false),
];

/// The directory to install into: `CLAUDE_PROJECT_DIR` when set, otherwise
/// the current directory.
pub fn install_root() -> Result<PathBuf> {
    match env::var_os(PROJECT_DIR_ENV).filter(|d| !d.is_empty()) {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => env::current_dir().context("resolving current directory"),
    }
}

/// Entry point for `cc-sessions install`.
pub fn run() -> Result<()> {
    let root = install_root()?;
    let binary = env::current_exe().context("locating the cc-sessions executable")?;
    let runner = SystemRunner;
    let prompter = StdinPrompter;
    Installer::new(root, &runner, &prompter)
        .hook_binary(binary)
        .bin_dir(env::var_os(BIN_DIR_ENV).filter(|d| !d.is_empty()).map(PathBuf::from))
        .install()
}

/// Create every project directory the hooks use. Safe to repeat.
pub fn create_directories(root: &Path) -> Result<()> {
    for dir in PROJECT_DIRS {
        let path = root.join(dir);
        fs::create_dir_all(&path).with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

/// Parse a comma-separated list of 1-based [`TOOL_MENU`] numbers. Invalid
/// entries are skipped.
pub fn parse_tool_selection(input: &str) -> Vec<String> {
    input
        .split(',')
        .filter_map(|n| n.trim().parse::<usize>().ok())
        .filter_map(|n| n.checked_sub(1).and_then(|i| TOOL_MENU.get(i)))
        .map(|(name, _, _)| name.to_string())
        .collect()
}

fn heading(title: &str) {
    println!("{}", format!("\n★ {title}").bold().magenta());
    println!("{}", "─".repeat(60).dimmed());
}

pub struct Installer<'a> {
    root: PathBuf,
    runner: &'a dyn CommandRunner,
    prompter: &'a dyn Prompter,
    hook_binary: Option<PathBuf>,
    bin_dir: Option<PathBuf>,
    today: NaiveDate,
    config: SessionsConfig,
    mcp_servers: OnceCell<BTreeSet<McpServer>>,
}

impl<'a> Installer<'a> {
    pub fn new(root: PathBuf, runner: &'a dyn CommandRunner, prompter: &'a dyn Prompter) -> Self {
        Self {
            root,
            runner,
            prompter,
            hook_binary: None,
            bin_dir: None,
            today: Local::now().date_naive(),
            config: SessionsConfig::default(),
            mcp_servers: OnceCell::new(),
        }
    }

    /// Executable copied to `.claude/hooks/`. Without one, that step is skipped.
    pub fn hook_binary(mut self, path: PathBuf) -> Self {
        self.hook_binary = Some(path);
        self
    }

    /// Directory for the `daic` helper instead of the platform default.
    pub fn bin_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.bin_dir = dir;
        self
    }

    #[cfg(test)]
    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn install(mut self) -> Result<()> {
        println!("{}", "╔════════════════════════════════════════════╗".bold());
        println!("{}", "║            cc-sessions Installer           ║".bold());
        println!("{}", "╚════════════════════════════════════════════╝".bold());
        println!("  Project: {}", self.root.display());
        println!();

        self.check_dependencies()?;
        println!("{}", "Creating directory structure...".cyan());
        create_directories(&self.root)?;
        self.copy_files()?;
        self.install_daic_command();
        self.setup_integrations()?;
        self.configure()?;
        self.save_config()?;
        self.print_summary();
        Ok(())
    }

    fn installed_servers(&self) -> &BTreeSet<McpServer> {
        self.mcp_servers.get_or_init(|| {
            if self.runner.exists("claude") {
                installed_mcp_servers(self.runner)
            } else {
                BTreeSet::new()
            }
        })
    }

    fn check_dependencies(&self) -> Result<()> {
        println!("{}", "Checking dependencies...".cyan());
        if !self.runner.exists("git") {
            println!("{}", "⚠️  Warning: Git not found. Sessions works best with git.".yellow());
            if !self.prompter.confirm("Continue anyway?")? {
                bail!("git is not installed");
            }
        }
        if !self.runner.exists("claude") {
            println!(
                "{}",
                "⚠️  Warning: claude CLI not found. MCP integrations will be unavailable.".yellow()
            );
        }
        Ok(())
    }

    fn copy_files(&self) -> Result<()> {
        println!("{}", "Installing hooks...".cyan());
        match &self.hook_binary {
            Some(binary) => {
                let dest = self.root.join(".claude/hooks").join(HOOK_BINARY);
                if !same_file(binary, &dest) {
                    fs::copy(binary, &dest).with_context(|| {
                        format!("copying {} to {}", binary.display(), dest.display())
                    })?;
                }
                make_executable(&dest)?;
            }
            None => tracing::debug!("no hook binary given, skipping copy"),
        }

        println!("{}", "Installing protocols, agents, commands and templates...".cyan());
        for (dest, contents) in BUNDLED_FILES {
            let path = self.root.join(dest);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        }
        Ok(())
    }

    fn daic_target_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.bin_dir {
            return Some(dir.clone());
        }
        if cfg!(windows) {
            dirs::home_dir().map(|home| home.join("AppData").join("Local").join("cc-sessions").join("bin"))
        } else {
            Some(PathBuf::from("/usr/local/bin"))
        }
    }

    fn daic_script(&self) -> (&'static str, String) {
        let binary = self.root.join(".claude").join("hooks").join(HOOK_BINARY);
        if cfg!(windows) {
            (
                "daic.cmd",
                format!("@echo off\r\n\"{}\" daic %*\r\n", binary.display()),
            )
        } else {
            (
                "daic",
                format!(
                    "#!/bin/sh\nexec \"${{CLAUDE_PROJECT_DIR:-{}}}/.claude/hooks/{HOOK_BINARY}\" daic \"$@\"\n",
                    self.root.display()
                ),
            )
        }
    }

    /// Install the global `daic` helper. Never fatal.
    fn install_daic_command(&self) {
        println!("{}", "Installing daic command...".cyan());
        let Some(dir) = self.daic_target_dir() else {
            println!("{}", "⚠️  Could not determine where to install daic.".yellow());
            return;
        };
        let (name, script) = self.daic_script();
        let dest = dir.join(name);
        match write_script(&dir, &dest, &script) {
            Ok(()) => {
                println!("{}", format!("  ✓ Installed {name} to {}", dir.display()).green());
                if cfg!(windows) {
                    println!(
                        "{}",
                        format!("  ℹ Add {} to your PATH to use 'daic' command", dir.display()).yellow()
                    );
                }
            }
            Err(e) if is_permission_denied(&e) && cfg!(unix) => {
                println!("{}", format!("⚠️  Cannot write to {}. Trying with sudo...", dir.display()).yellow());
                if let Err(e) = self.sudo_install(&script, &dest) {
                    println!("{}", "⚠️  Could not install daic command globally.".yellow());
                    println!("{}", format!("    {e:#}").dimmed());
                }
            }
            Err(e) => {
                println!("{}", "⚠️  Could not install daic command globally.".yellow());
                println!("{}", format!("    {e:#}").dimmed());
            }
        }
    }

    fn sudo_install(&self, script: &str, dest: &Path) -> Result<()> {
        let staged = tempfile::NamedTempFile::new().context("staging daic script")?;
        fs::write(staged.path(), script)?;
        let staged_path = staged.path().to_string_lossy().into_owned();
        let dest = dest.to_string_lossy().into_owned();
        for args in [
            vec!["cp", staged_path.as_str(), dest.as_str()],
            vec!["chmod", "+x", dest.as_str()],
        ] {
            let invocation = Invocation::new("sudo", &args).interactive();
            let out = self
                .runner
                .run(&invocation)
                .with_context(|| format!("running {}", invocation.display()))?;
            if !out.success {
                bail!("`{}` failed", invocation.display());
            }
        }
        Ok(())
    }

    fn configure(&mut self) -> Result<()> {
        println!();
        println!("{}", "╔═══════════════════════════════════════════════════════════════╗".bold().cyan());
        println!("{}", "║                    CONFIGURATION SETUP                        ║".bold().cyan());
        println!("{}", "╚═══════════════════════════════════════════════════════════════╝".bold().cyan());

        heading("DEVELOPER IDENTITY");
        println!("{}", "  Claude will use this name when addressing you in sessions".dimmed());
        let name = self.prompter.ask("Your name: ")?;
        let name = name.trim();
        if !name.is_empty() {
            self.config.developer_name = name.to_string();
            println!("{}", format!("  ✓ Hello, {name}!").green());
        }

        heading("DAIC WORKFLOW CONFIGURATION");
        println!("  The DAIC system enforces discussion before implementation.");
        println!("{}", "  Default triggers:".cyan());
        for phrase in &self.config.trigger_phrases {
            println!("{}", format!("    → \"{phrase}\"").green());
        }
        println!("{}", "  Hint: Common additions: \"implement it\", \"do it\", \"proceed\"".dimmed());
        loop {
            let phrase = self.prompter.ask("Add custom trigger phrase (Enter to skip): ")?;
            let phrase = phrase.trim();
            if phrase.is_empty() {
                break;
            }
            self.config.trigger_phrases.push(phrase.to_string());
            println!("{}", format!("  ✓ Added: \"{phrase}\"").green());
        }

        heading("THINKING BUDGET CONFIGURATION");
        println!("{}", "  • Max users (recommended): Automatic ultrathink every message".dimmed());
        println!("{}", "  • API users: Manual control with [[ ultrathink ]] when needed".dimmed());
        if self.prompter.confirm("Enable automatic ultrathink for best performance?")? {
            self.config.api_mode = false;
            println!("{}", "  ✓ Max mode - ultrathink enabled".green());
        } else {
            self.config.api_mode = true;
            println!("{}", "  ✓ API mode - manual ultrathink control (use [[ ultrathink ]])".green());
        }

        heading("ADVANCED OPTIONS");
        if self.prompter.confirm("Configure advanced options?")? {
            self.configure_blocked_tools()?;
            self.configure_task_prefixes()?;
        }

        heading("DOCUMENT GOVERNANCE");
        println!("{}", "  Validates planned work against PRD/FSD/EPIC documents and versions them.".dimmed());
        if self.prompter.confirm("Enable document governance?")? {
            let governance = &mut self.config.document_governance;
            governance.enabled = true;
            let question = format!("Documents path [{}]: ", governance.documents_path);
            let path = self.prompter.ask(&question)?;
            let path = path.trim();
            if !path.is_empty() {
                governance.documents_path = path.to_string();
                let docs = self.root.join(path);
                for sub in ["", "versions", "archive"] {
                    let dir = docs.join(sub);
                    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
                }
            }
            println!("{}", "  ✓ Document governance enabled".green());
        }
        Ok(())
    }

    fn configure_blocked_tools(&mut self) -> Result<()> {
        println!("{}", "  Available tools:".bold());
        for (i, (name, desc, blocked)) in TOOL_MENU.iter().enumerate() {
            let label = format!("{name:<15}");
            if *blocked {
                println!("    {:2}. 🔒 {} - {desc}", i + 1, label.yellow());
            } else {
                println!("    {:2}. 🔓 {} - {desc}", i + 1, label.green());
            }
        }
        if !self.prompter.confirm("Modify blocked tools list?")? {
            return Ok(());
        }
        let selection = self.prompter.ask("Enter comma-separated tool numbers to block: ")?;
        let blocked = parse_tool_selection(&selection);
        if !blocked.is_empty() {
            self.config.blocked_tools = blocked;
            println!("{}", "  ✓ Tool blocking configuration saved".green());
        }
        Ok(())
    }

    fn configure_task_prefixes(&mut self) -> Result<()> {
        heading("TASK PREFIX CONFIGURATION");
        println!("    → h- (high priority)");
        println!("    → m- (medium priority)");
        println!("    → l- (low priority)");
        println!("    → ?- (investigate/research)");
        if !self.prompter.confirm("Customize task prefixes?")? {
            return Ok(());
        }
        let mut priority = Vec::new();
        for (label, default) in [
            ("High priority", "h-"),
            ("Medium priority", "m-"),
            ("Low priority", "l-"),
            ("Investigate", "?-"),
        ] {
            let answer = self.prompter.ask(&format!("{label} prefix [{default}]: "))?;
            let answer = answer.trim();
            priority.push(if answer.is_empty() { default } else { answer }.to_string());
        }
        self.config.task_prefixes = TaskPrefixes { priority };
        println!("{}", "  ✓ Task prefixes updated".green());
        Ok(())
    }

    fn save_config(&self) -> Result<()> {
        println!("{}", "Creating configuration...".cyan());
        self.config.save(&self.root)?;

        println!("{}", "Configuring hooks in settings.json...".cyan());
        if settings::update_settings(&self.root)? {
            println!("{}", "  Merged sessions hooks into existing settings.json".cyan());
        }
        println!("{}", "✓ Sessions hooks configured in settings.json".green());

        let store = StateStore::new(&self.root);
        store.set_mode(DaicMode::Discussion)?;
        store.save_task_state(&TaskState {
            updated: Some(self.today),
            ..Default::default()
        })?;
        Ok(())
    }

    fn print_summary(&self) {
        println!();
        println!("{}", "╔═══════════════════════════════════════════════════════════════╗".bold().green());
        println!("{}", "║                 🎉 INSTALLATION COMPLETE! 🎉                  ║".bold().green());
        println!("{}", "╚═══════════════════════════════════════════════════════════════╝".bold().green());
        println!();
        for line in [
            "✓ Directory structure created",
            "✓ Hooks installed and configured",
            "✓ Protocols and agents deployed",
            "✓ Configuration saved",
            "✓ DAIC state initialized (Discussion mode)",
        ] {
            println!("{}", format!("  {line}").green());
        }
        if self.runner.exists("daic") {
            println!("{}", "  ✓ daic command verified and working".green());
        } else {
            println!("{}", "  ⚠ daic command not in PATH".yellow());
        }
        println!();
        println!("{}", "  ★ NEXT STEPS".bold().magenta());
        println!("  1. Restart Claude Code to activate the sessions hooks");
        println!("  2. Create your first task: tell Claude \"Create a new task\"");
        println!("  3. Discuss first, say \"make it so\" to implement, run \"daic\" to return to discussion");
        println!();
        println!(
            "{}",
            format!("  Welcome aboard, {}! 🚀", self.config.developer_name).bold().cyan()
        );
    }
}

fn is_permission_denied(e: &anyhow::Error) -> bool {
    e.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::PermissionDenied)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn write_script(dir: &Path, dest: &Path, script: &str) -> Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dest, script)?;
    make_executable(dest)?;
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("setting permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
