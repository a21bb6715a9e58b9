//! Scripted `CommandRunner` for unit tests.

use super::{CommandOutput, CommandRunner, Invocation};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io;

/// Answers `exists` from a fixed set of programs and `run` from canned
/// responses keyed by the full command line. Unscripted commands fail to
/// spawn. Every `run` call is recorded.
#[derive(Default)]
pub struct ScriptedRunner {
    programs: HashSet<String>,
    responses: HashMap<String, Result<CommandOutput, io::ErrorKind>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_programs(mut self, programs: &[&str]) -> Self {
        self.programs.extend(programs.iter().map(|p| p.to_string()));
        self
    }

    pub fn respond(mut self, command_line: &str, stdout: &str) -> Self {
        self.responses.insert(
            command_line.to_string(),
            Ok(CommandOutput {
                success: true,
                stdout: stdout.to_string(),
                stderr: String::new(),
            }),
        );
        self
    }

    pub fn fail(mut self, command_line: &str) -> Self {
        self.responses.insert(
            command_line.to_string(),
            Ok(CommandOutput {
                success: false,
                stdout: String::new(),
                stderr: "failed".into(),
            }),
        );
        self
    }

    pub fn time_out(mut self, command_line: &str) -> Self {
        self.responses
            .insert(command_line.to_string(), Err(io::ErrorKind::TimedOut));
        self
    }

    /// A runner where `claude mcp list` reports the memory bank server.
    pub fn with_memory_bank() -> Self {
        Self::new()
            .with_programs(&["claude"])
            .respond("claude mcp list", "memory-bank: npx memory-bank-mcp - ✓ Connected\n")
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn was_called(&self, command_line: &str) -> bool {
        self.calls.borrow().iter().any(|c| c == command_line)
    }
}

impl CommandRunner for ScriptedRunner {
    fn exists(&self, program: &str) -> bool {
        self.programs.contains(program)
    }

    fn run(&self, invocation: &Invocation<'_>) -> io::Result<CommandOutput> {
        let line = invocation.display();
        self.calls.borrow_mut().push(line.clone());
        match self.responses.get(&line) {
            Some(Ok(out)) => Ok(out.clone()),
            Some(Err(kind)) => Err(io::Error::new(*kind, format!("{line}: scripted error"))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{line}: not scripted"),
            )),
        }
    }
}
