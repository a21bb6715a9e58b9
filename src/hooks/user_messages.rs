use anyhow::Result;

use super::{HookContext, HookOutcome, proceed};
use crate::config::SessionsConfig;
use crate::state::DaicMode;
use crate::types::{HookEvent, HookOutput};

/// The first configured trigger phrase found in `prompt`, ignoring case.
pub fn find_trigger<'c>(config: &'c SessionsConfig, prompt: &str) -> Option<&'c str> {
    let prompt = prompt.to_lowercase();
    config
        .trigger_phrases
        .iter()
        .map(String::as_str)
        .filter(|p| !p.trim().is_empty())
        .find(|p| prompt.contains(&p.to_lowercase()))
}

pub fn run(event: &HookEvent, ctx: &HookContext) -> Result<HookOutcome> {
    let store = ctx.store();
    if !store.is_discussion() {
        return proceed();
    }
    let config = ctx.config();
    let Some(phrase) = find_trigger(&config, &event.prompt) else {
        return proceed();
    };

    store.set_mode(DaicMode::Implementation)?;
    tracing::info!(phrase, "trigger phrase switched to implementation mode");
    Ok(HookOutcome::Proceed(Some(HookOutput::prompt_context(format!(
        "[DAIC: Implementation Mode Activated] Trigger phrase \"{phrase}\" detected. \
         You may now use {}. Implement only what was agreed, then run `daic` to return \
         to discussion mode.",
        config.blocked_tools.join(", ")
    )))))
}
