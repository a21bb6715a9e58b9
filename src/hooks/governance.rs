use anyhow::Result;
use std::path::Path;

use super::{HookContext, HookOutcome, proceed};
use crate::governance::{ContextData, KeywordPolicy, snapshot_document, validate_against_documents};
use crate::types::{HookEvent, is_implementation_tool};

const CONTEXT_AGENT: &str = "context-gathering";

pub fn run(event: &HookEvent, ctx: &HookContext) -> Result<HookOutcome> {
    let config = ctx.config().document_governance;
    if !config.enabled {
        return proceed();
    }

    if event.tool_call().delegates_to(CONTEXT_AGENT) {
        let data = ContextData {
            summary: "Context analysis completed".into(),
            plan: event.tool_input_text(),
            ..Default::default()
        };
        if config.auto_context_retention {
            if let Some(path) = ctx.recorder().preserve_context(&data, ctx.now) {
                tracing::info!(path = %path.display(), "preserved context analysis");
            }
        }
        if config.document_validation {
            let validation =
                validate_against_documents(&config, ctx.project_root, &data, &KeywordPolicy);
            if !validation.passed() {
                // Advisory: the Task call itself still goes ahead.
                eprintln!("🛑 Implementation blocked due to document conflicts.");
                eprintln!("Please resolve conflicts before proceeding.");
            }
        }
    }

    if is_implementation_tool(&event.tool_name) {
        if let Some(target) = event.tool_call().target_path() {
            let snapshot = snapshot_document(&config, ctx.project_root, Path::new(target), ctx.now)?;
            if let Some(path) = snapshot {
                tracing::info!(path = %path.display(), "saved document version");
            }
        }
    }

    proceed()
}
