//! Optional MCP server integrations offered during install.

use anyhow::{Result, bail};
use owo_colors::OwoColorize;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::Installer;
use crate::config::SyncFile;
use crate::external::{Invocation, McpServer};

pub const STORYBOOK_URL: &str = "http://localhost:6006/index.json";
const GITHUB_SERVER_REPO: &str = "https://github.com/github/github-mcp-server.git";

struct Requirement {
    program: &'static str,
    label: &'static str,
}

const CLAUDE: Requirement = Requirement {
    program: "claude",
    label: "claude (Claude Code CLI)",
};
const NPX: Requirement = Requirement {
    program: "npx",
    label: "npx (Node.js package runner)",
};

/// One integration the installer can set up.
pub struct Integration {
    pub server: McpServer,
    pub name: &'static str,
    requirements: &'static [Requirement],
    install_hint: &'static str,
    question: &'static str,
}

pub const INTEGRATIONS: [Integration; 5] = [
    Integration {
        server: McpServer::Serena,
        name: "Serena MCP",
        requirements: &[
            Requirement {
                program: "uv",
                label: "uv (Python package manager)",
            },
            CLAUDE,
        ],
        install_hint: "Install with: curl -LsSf https://astral.sh/uv/install.sh | sh",
        question: "Install Serena MCP for enhanced code analysis?",
    },
    Integration {
        server: McpServer::MemoryBank,
        name: "Memory Bank MCP",
        requirements: &[NPX, CLAUDE],
        install_hint: "Install Node.js to get npx: https://nodejs.org/",
        question: "Install Memory Bank MCP for persistent context analysis?",
    },
    Integration {
        server: McpServer::Github,
        name: "GitHub MCP",
        requirements: &[
            Requirement {
                program: "go",
                label: "go (Go programming language)",
            },
            CLAUDE,
            Requirement {
                program: "git",
                label: "git (version control)",
            },
        ],
        install_hint: "Install Go: https://golang.org/doc/install",
        question: "Install GitHub MCP for repository management and automation?",
    },
    Integration {
        server: McpServer::Storybook,
        name: "Storybook MCP",
        requirements: &[NPX, CLAUDE],
        install_hint: "Install Node.js to get npx: https://nodejs.org/",
        question: "Install Storybook MCP for component development workflows? (requires package installation)",
    },
    Integration {
        server: McpServer::Playwright,
        name: "Playwright MCP",
        requirements: &[NPX, CLAUDE],
        install_hint: "Install Node.js to get npx: https://nodejs.org/",
        question: "Install Playwright MCP for browser automation and testing? (requires package installation)",
    },
];

/// `claude mcp add-json serena` payload.
pub fn serena_server_json() -> String {
    json!({
        "type": "stdio",
        "command": "uvx",
        "args": [
            "--from", "git+https://github.com/oraios/serena",
            "serena", "start-mcp-server",
            "--enable-web-dashboard", "false",
            "--enable-gui-log-window", "false",
            "--log-level", "WARNING"
        ]
    })
    .to_string()
}

/// Whether `package.json` under `root` depends on `pattern`. A trailing `*`
/// matches any package with that prefix, e.g. `@storybook/*`.
pub fn package_installed(root: &Path, pattern: &str) -> bool {
    let Ok(text) = fs::read_to_string(root.join("package.json")) else {
        return false;
    };
    let Ok(manifest) = serde_json::from_str::<Value>(&text) else {
        return false;
    };
    let matches = |name: &String| match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => name == pattern,
    };
    ["dependencies", "devDependencies"].iter().any(|section| {
        manifest
            .get(section)
            .and_then(Value::as_object)
            .is_some_and(|deps| deps.keys().any(|name| matches(name)))
    })
}

const PRD_MARKERS: &[&str] = &["prd", "product-req", "product_req", "requirements"];
const FSD_MARKERS: &[&str] = &["fsd", "functional-spec", "functional_spec", "spec"];

/// Requirement documents found under `folder`, as paths relative to `root`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DetectedDocuments {
    pub prd: Option<String>,
    pub fsd: Option<String>,
}

/// First PRD-like and first FSD-like `.md` file under `folder`, in path
/// order. A name matching both counts as a PRD.
pub fn detect_requirement_documents(root: &Path, folder: &Path) -> DetectedDocuments {
    let mut found = DetectedDocuments::default();
    let files = WalkDir::new(folder)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file());
    for entry in files {
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if !name.ends_with(".md") {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        if PRD_MARKERS.iter().any(|m| name.contains(m)) {
            found.prd.get_or_insert(relative);
        } else if FSD_MARKERS.iter().any(|m| name.contains(m)) {
            found.fsd.get_or_insert(relative);
        }
    }
    found
}

impl Installer<'_> {
    /// Offer every integration in turn. Failures are reported and skipped.
    pub(super) fn setup_integrations(&mut self) -> Result<()> {
        for integration in &INTEGRATIONS {
            let enabled = self.setup_integration(integration)?;
            if enabled && integration.server == McpServer::MemoryBank {
                self.configure_memory_bank_files()?;
            }
        }
        Ok(())
    }

    fn setup_integration(&mut self, integration: &Integration) -> Result<bool> {
        if self.installed_servers().contains(&integration.server) {
            println!("{}", format!("✓ {} already installed", integration.name).green());
            self.enable(integration.server);
            return Ok(true);
        }

        let missing: Vec<&str> = integration
            .requirements
            .iter()
            .filter(|r| !self.runner.exists(r.program))
            .map(|r| r.label)
            .collect();
        if !missing.is_empty() {
            println!(
                "{}",
                format!(
                    "⚠️  {} requirements not met. Missing: {}",
                    integration.name,
                    missing.join(", ")
                )
                .yellow()
            );
            println!("{}", format!("   {}", integration.install_hint).dimmed());
            println!(
                "{}",
                format!("   {} features will be disabled.", integration.name).dimmed()
            );
            return Ok(false);
        }

        println!("{}", format!("✓ {} requirements detected", integration.name).green());
        if !self.prompter.confirm(integration.question)? {
            return Ok(false);
        }
        match self.install_server(integration.server) {
            Ok(true) => {
                println!("{}", format!("  ✓ {} server configured", integration.name).green());
                self.enable(integration.server);
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => {
                println!(
                    "{}",
                    format!("  ⚠️ {} installation failed, continuing without it", integration.name)
                        .yellow()
                );
                println!("{}", format!("    {e:#}").dimmed());
                Ok(false)
            }
        }
    }

    fn enable(&mut self, server: McpServer) {
        match server {
            McpServer::Serena => self.config.serena_mcp.enabled = true,
            McpServer::MemoryBank => self.config.memory_bank_mcp.enabled = true,
            McpServer::Github => self.config.github_mcp.enabled = true,
            McpServer::Storybook => self.config.storybook_mcp.enabled = true,
            McpServer::Playwright => self.config.playwright_mcp.enabled = true,
        }
    }

    /// Run the install commands for `server`. `Ok(false)` means the user or
    /// the project ruled it out; `Err` means a command failed.
    fn install_server(&mut self, server: McpServer) -> Result<bool> {
        match server {
            McpServer::Serena => {
                let payload = serena_server_json();
                self.run_step(&Invocation::new("claude", &["mcp", "add-json", "serena", payload.as_str()]))?;
                println!(
                    "{}",
                    "    Remember to activate your project: \"Activate the project /path/to/project\""
                        .dimmed()
                );
                Ok(true)
            }
            McpServer::MemoryBank => {
                let bank_root = self.root.join("sessions").join("memory_bank");
                fs::create_dir_all(&bank_root)?;
                let bank_root = bank_root.to_string_lossy().into_owned();
                self.run_step(
                    &Invocation::new(
                        "npx",
                        &["-y", "@smithery/cli", "install", "@alioshr/memory-bank-mcp", "--client", "claude"],
                    )
                    .env("MEMORY_BANK_ROOT", &bank_root),
                )?;
                println!("{}", format!("    Memory bank root: {bank_root}").dimmed());
                self.config.memory_bank_mcp.memory_bank_root = bank_root;
                Ok(true)
            }
            McpServer::Github => self.install_github(),
            McpServer::Storybook => {
                if !self.require_package_json("Storybook MCP") {
                    return Ok(false);
                }
                if package_installed(&self.root, "@storybook/*") {
                    println!("{}", "  ✓ Storybook packages already installed".green());
                } else {
                    println!("{}", "  Storybook packages not found, installing...".dimmed());
                    for package in ["@storybook/react", "@storybook/react-webpack5", "storybook"] {
                        self.npm_install_dev(package)?;
                    }
                }
                self.run_step(&Invocation::new(
                    "claude",
                    &["mcp", "add", "storybook", "npx", "-y", "storybook-mcp"],
                ))?;
                println!("{}", format!("    Storybook URL: {STORYBOOK_URL}").green());
                self.config.storybook_mcp.storybook_url = STORYBOOK_URL.into();
                Ok(true)
            }
            McpServer::Playwright => {
                if !self.require_package_json("Playwright MCP") {
                    return Ok(false);
                }
                if package_installed(&self.root, "@playwright/test") {
                    println!("{}", "  ✓ Playwright packages already installed".green());
                } else {
                    println!("{}", "  Playwright packages not found, installing...".dimmed());
                    self.npm_install_dev("@playwright/test")?;
                }
                println!("{}", "  Installing Playwright browser binaries...".dimmed());
                let browsers = Invocation::new("npx", &["playwright", "install"]).cwd(&self.root);
                if let Err(e) = self.run_step(&browsers) {
                    println!("{}", "  ⚠️ Failed to install Playwright browser binaries".yellow());
                    println!("{}", format!("    {e:#}").dimmed());
                    println!(
                        "{}",
                        "    You can install them manually with: npx playwright install".dimmed()
                    );
                }
                self.run_step(&Invocation::new(
                    "claude",
                    &["mcp", "add", "playwright", "npx", "@playwright/mcp@latest"],
                ))?;
                Ok(true)
            }
        }
    }

    fn install_github(&mut self) -> Result<bool> {
        println!(
            "{}",
            "  Note: You will need a GitHub Personal Access Token to use this server".yellow()
        );
        println!("{}", "  Create one at: https://github.com/settings/tokens".dimmed());
        println!("{}", "  Recommended scopes: repo, read:packages, read:org".dimmed());
        let token = self.prompter.ask("Enter your GitHub Personal Access Token: ")?;
        let token = token.trim();
        if token.is_empty() {
            println!(
                "{}",
                "  ⚠️ GitHub token required, skipping GitHub MCP installation".yellow()
            );
            return Ok(false);
        }

        let build_dir = self.root.join(".claude").join("mcp-servers");
        fs::create_dir_all(&build_dir)?;
        let checkout = build_dir.join("github-mcp-server");
        let checkout_arg = checkout.to_string_lossy().into_owned();
        println!("{}", "  Cloning GitHub MCP server...".dimmed());
        self.run_step(&Invocation::new("git", &["clone", GITHUB_SERVER_REPO, checkout_arg.as_str()]))?;
        println!("{}", "  Building GitHub MCP server...".dimmed());
        self.run_step(
            &Invocation::new("go", &["build", "-o", "github-mcp-server"]).cwd(&checkout),
        )?;

        let payload = json!({
            "type": "stdio",
            "command": checkout.join("github-mcp-server").to_string_lossy(),
            "args": ["stdio"],
            "env": { "GITHUB_PERSONAL_ACCESS_TOKEN": token }
        })
        .to_string();
        self.run_step(&Invocation::new("claude", &["mcp", "add-json", "github", payload.as_str()]))?;
        Ok(true)
    }

    fn require_package_json(&self, name: &str) -> bool {
        if self.root.join("package.json").is_file() {
            return true;
        }
        println!(
            "{}",
            format!("  ⚠️ No package.json found. {name} requires a Node.js project.").yellow()
        );
        println!("{}", "    Initialize with: npm init".dimmed());
        false
    }

    fn npm_install_dev(&self, package: &str) -> Result<()> {
        println!("{}", format!("  Installing {package}...").dimmed());
        self.run_step(&Invocation::new("npm", &["install", "--save-dev", package]).cwd(&self.root))?;
        println!("{}", format!("  ✓ Installed {package}").green());
        Ok(())
    }

    /// Run one install command in the foreground; a spawn failure or a
    /// non-zero exit is an error.
    fn run_step(&self, invocation: &Invocation<'_>) -> Result<()> {
        let shown = invocation.clone().interactive();
        match self.runner.run(&shown) {
            Ok(out) if out.success => Ok(()),
            Ok(_) => bail!("`{}` failed", redact(invocation)),
            Err(e) => bail!("`{}` could not run: {e}", redact(invocation)),
        }
    }

    fn configure_memory_bank_files(&mut self) -> Result<()> {
        println!("{}", "\n  📋 Requirement Documents".cyan());
        println!("{}", "  Specify folder to search for PRD/FSD files automatically.".dimmed());
        let folder = self
            .prompter
            .ask("Folder path to search for PRD/FSD files (relative to project root, or Enter to skip): ")?;
        let folder = folder.trim();

        let mut detected = DetectedDocuments::default();
        if !folder.is_empty() {
            let search_dir = self.root.join(folder);
            if search_dir.is_dir() {
                detected = detect_requirement_documents(&self.root, &search_dir);
                if let Some(prd) = &detected.prd {
                    println!("{}", format!("  ✓ PRD detected: \"{prd}\"").green());
                }
                if let Some(fsd) = &detected.fsd {
                    println!("{}", format!("  ✓ FSD detected: \"{fsd}\"").green());
                }
                if detected == DetectedDocuments::default() {
                    println!("{}", format!("  ⚠️ No PRD/FSD files found in {folder}").yellow());
                }
            } else {
                println!("{}", format!("  ⚠️ Folder not found: {folder}").yellow());
            }
        }

        self.config.document_governance.prd_file = detected.prd.clone();
        self.config.document_governance.fsd_file = detected.fsd.clone();
        for path in [detected.prd, detected.fsd].into_iter().flatten() {
            println!("{}", format!("  ✓ Auto-added requirement doc: \"{path}\"").green());
            self.config.memory_bank_mcp.sync_files.push(SyncFile::pending(path));
        }

        println!("{}", "\n  📄 File Synchronization Setup".cyan());
        loop {
            let answer = self.prompter.ask(
                "Add markdown file to sync (Enter path relative to project root, or Enter to skip): ",
            )?;
            let path = answer.trim();
            if path.is_empty() {
                break;
            }
            let sync_files = &mut self.config.memory_bank_mcp.sync_files;
            if sync_files.iter().any(|f| f.path == path) {
                println!("{}", format!("  ⚠️ File already added: {path}").yellow());
                continue;
            }
            if !self.root.join(path).exists() {
                println!("{}", format!("  ⚠️ File not found: {path}").yellow());
                continue;
            }
            if !path.to_lowercase().ends_with(".md") {
                println!("{}", "  ⚠️ Only markdown files (.md) are supported".yellow());
                continue;
            }
            sync_files.push(SyncFile::pending(path));
            println!("{}", format!("  ✓ Added: \"{path}\"").green());
        }
        Ok(())
    }
}

/// Command line for messages, with JSON payloads (which may carry tokens)
/// elided.
fn redact(invocation: &Invocation<'_>) -> String {
    std::iter::once(invocation.program.to_string())
        .chain(invocation.args.iter().map(|a| {
            if a.starts_with('{') {
                "<config>".to_string()
            } else {
                a.clone()
            }
        }))
        .collect::<Vec<_>>()
        .join(" ")
}
