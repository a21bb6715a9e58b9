use anyhow::Result;

use super::{HookContext, HookOutcome, proceed};
use crate::records::ImplementationOutcome;
use crate::types::{HookEvent, is_implementation_tool};

pub fn run(event: &HookEvent, ctx: &HookContext) -> Result<HookOutcome> {
    if !ctx.config().document_governance.retention_enabled() {
        return proceed();
    }
    let recorder = ctx.recorder();

    if is_implementation_tool(&event.tool_name) {
        let outcome = ImplementationOutcome::analyze(&event.tool_name, &event.tool_call());
        if outcome.is_significant() {
            recorder.preserve_implementation(&outcome, ctx.now);
        }
    }

    // A `daic` call marks the end of an implementation round; so does any
    // tool use after the flag is back in discussion mode.
    if event.tool_call().runs_daic() || ctx.store().is_discussion() {
        recorder.preserve_completion(ctx.now);
    }

    proceed()
}
