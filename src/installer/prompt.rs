use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};

/// The installer's interactive channel.
pub trait Prompter {
    /// Ask `question` and return the answer without its trailing newline.
    /// End of input answers with an empty string.
    fn ask(&self, question: &str) -> Result<String>;

    /// y/n question; anything but `y` is a no.
    fn confirm(&self, question: &str) -> Result<bool> {
        let answer = self.ask(&format!("{question} (y/n): "))?;
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }
}

pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&self, question: &str) -> Result<String> {
        print!("  {}", question.cyan());
        io::stdout().flush().ok();
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("reading answer from stdin")?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}
