//! The five hooks, each a subcommand of `cc-sessions hook`.
//!
//! A hook reads one JSON event from stdin and answers with a [`HookOutcome`].
//! `main` turns the outcome into stdout, stderr and an exit code.

mod completion;
mod enforce;
mod governance;
mod retention;
mod user_messages;

use anyhow::Result;
use chrono::{DateTime, Local};
use clap::ValueEnum;
use std::fmt;
use std::path::Path;

use crate::config::SessionsConfig;
use crate::external::CommandRunner;
use crate::records::Recorder;
use crate::state::StateStore;
use crate::types::{HookEvent, HookOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HookName {
    DocumentGovernance,
    PostImplementationRetention,
    TaskCompletionWorkflow,
    SessionsEnforce,
    UserMessages,
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(v) => f.write_str(v.get_name()),
            None => write!(f, "{self:?}"),
        }
    }
}

/// What a hook decided.
#[derive(Debug)]
pub enum HookOutcome {
    /// Let the host continue, optionally with structured output on stdout.
    Proceed(Option<HookOutput>),
    /// Feed this message back to the assistant (stderr, exit 2).
    Advise(String),
}

/// Everything a hook may touch besides its event.
pub struct HookContext<'a> {
    pub project_root: &'a Path,
    pub runner: &'a dyn CommandRunner,
    pub now: DateTime<Local>,
}

impl<'a> HookContext<'a> {
    pub fn new(project_root: &'a Path, runner: &'a dyn CommandRunner, now: DateTime<Local>) -> Self {
        Self {
            project_root,
            runner,
            now,
        }
    }

    fn config(&self) -> SessionsConfig {
        SessionsConfig::load(self.project_root)
    }

    fn store(&self) -> StateStore {
        StateStore::new(self.project_root)
    }

    fn recorder(&self) -> Recorder<'a> {
        Recorder::new(self.project_root, self.runner)
    }
}

/// Run hook `name` against the raw stdin payload.
///
/// Never fails: an unparsable payload proceeds silently, and a hook error is
/// logged and also proceeds.
pub fn dispatch(name: HookName, raw: &str, ctx: &HookContext) -> HookOutcome {
    let Some(event) = HookEvent::parse(raw) else {
        tracing::debug!(hook = %name, "ignoring unparsable hook input");
        return HookOutcome::Proceed(None);
    };
    let result = match name {
        HookName::DocumentGovernance => governance::run(&event, ctx),
        HookName::PostImplementationRetention => retention::run(&event, ctx),
        HookName::TaskCompletionWorkflow => completion::run(&event, ctx),
        HookName::SessionsEnforce => enforce::run(&event, ctx),
        HookName::UserMessages => user_messages::run(&event, ctx),
    };
    result.unwrap_or_else(|e| {
        tracing::error!("{name} hook error: {e:#}");
        HookOutcome::Proceed(None)
    })
}

fn proceed() -> Result<HookOutcome> {
    Ok(HookOutcome::Proceed(None))
}
