//! Action-to-tool-result correlation.
//!
//! Tool invocations are recorded on an independent stream from the LLM calls
//! that requested them; there is no foreign key linking an `Action: foo` step
//! to the invocation that satisfied it. Correlation is a best-effort
//! heuristic: candidates are matched by tool name (and server name when the
//! action uses the dotted `server.tool` form) inside a bounded forward time
//! window, and the earliest candidate wins. No match is a normal outcome —
//! the action step renders with an empty result.

use serde_json::{Value as JsonValue, json};

use crate::types::{CommunicationKind, ToolInvocation};

/// Correlation window configuration.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationOptions {
    /// Forward window from the reference timestamp, in microseconds.
    /// The window is closed on both ends: a record at exactly
    /// `reference + window_us` still matches.
    pub window_us: i64,
}

impl Default for CorrelationOptions {
    fn default() -> Self {
        Self {
            window_us: 30_000_000,
        }
    }
}

/// A correlated tool result.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    pub payload: JsonValue,
    pub success: bool,
}

/// Find the tool result matching an action name at a reference timestamp.
pub fn find_action_result(
    action: &str,
    reference_us: i64,
    invocations: &[ToolInvocation],
    options: &CorrelationOptions,
) -> Option<ActionResult> {
    let (server, tool) = split_action(action);

    let mut best: Option<&ToolInvocation> = None;
    for invocation in invocations {
        if invocation.kind != CommunicationKind::ToolCall {
            continue;
        }
        if invocation.tool_name != tool {
            continue;
        }
        if let Some(server) = server
            && invocation.server_name.as_deref() != Some(server)
        {
            continue;
        }
        if invocation.timestamp_us < reference_us
            || invocation.timestamp_us > reference_us + options.window_us
        {
            continue;
        }
        // Strict less keeps the first record in input order on timestamp ties.
        if best.is_none_or(|b| invocation.timestamp_us < b.timestamp_us) {
            best = Some(invocation);
        }
    }

    let invocation = best?;
    let payload = result_payload(invocation)?;
    Some(ActionResult {
        payload,
        success: invocation.success,
    })
}

/// Split the dotted `server.tool` form; plain names have no server part.
pub(crate) fn split_action(action: &str) -> (Option<&str>, &str) {
    match action.split_once('.') {
        Some((server, tool)) if !server.is_empty() && !tool.is_empty() => (Some(server), tool),
        _ => (None, action),
    }
}

/// Resolve the result payload when the record itself is ambiguous:
/// `result`, then `tool_result`, then `available_tools`, then a synthetic
/// placeholder for successful records with no recorded payload.
fn result_payload(invocation: &ToolInvocation) -> Option<JsonValue> {
    for candidate in [
        &invocation.result,
        &invocation.tool_result,
        &invocation.available_tools,
    ] {
        if let Some(value) = candidate
            && !value.is_null()
        {
            return Some(value.clone());
        }
    }
    if invocation.success {
        return Some(json!("Tool call completed successfully"));
    }
    None
}
