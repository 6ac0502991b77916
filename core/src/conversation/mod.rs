//! Stage conversation pipeline.
//!
//! Reconstructs a clean step timeline for one pipeline stage from its raw
//! LLM interaction records and tool invocations. Interactions carry
//! cumulative message histories (each call re-sends everything from prior
//! calls plus the new turns), so the pipeline must both parse loosely
//! formatted agent output and suppress re-transmitted content.
//!
//! # Pipeline
//!
//! ```text
//! 1. ORDER      interactions by ascending timestamp
//! 2. EXTRACT    message history (structured field, flat fallback, repr decode)
//! 3. PARSE      assistant messages through ReAct section extraction
//! 4. CORRELATE  action steps with tool invocations (bounded time window)
//! 5. DEDUP      suppress re-transmitted history content (per-stage seen-set)
//! 6. FALLBACK   placeholder step for an in-flight stage with no steps yet
//! ```
//!
//! The whole pass is pure and recomputes from scratch on every call: no state
//! survives between invocations, so correctness never depends on what a
//! previous render pass saw. A malformed interaction skips its own
//! contribution and the rest of the stage still renders.

mod dedup;
mod types;


use serde_json::Value as JsonValue;

use crate::correlate::{find_action_result, split_action};
use crate::pyrepr;
use crate::react::{ReactSections, parse_react};
use crate::types::{ConversationStep, LlmInteraction, MessageRole, RawMessage, StepKind, ToolInvocation};

use dedup::SeenSteps;

pub use types::{BuilderOptions, DedupOptions, StageConversation, StageMetadata, StageStatus};

/// System-message marker phrases that identify a summarization interaction.
const SUMMARIZATION_MARKERS: &[&str] = &[
    "summarizing technical output",
    "expert at summarizing technical output",
];

/// Placeholder content for an active stage with no recovered steps yet.
const STAGE_STARTING_PLACEHOLDER: &str = "Stage is starting...";

// ============================================================================
// PUBLIC API
// ============================================================================

/// Build the ordered, deduplicated step sequence for one stage.
pub fn build_stage_conversation(
    interactions: &[LlmInteraction],
    invocations: &[ToolInvocation],
    status: StageStatus,
    options: &BuilderOptions,
) -> StageConversation {
    // The dedup pass assumes non-decreasing timestamps; order defensively in
    // case the fetching layer handed records over out of order.
    let mut ordered: Vec<&LlmInteraction> = interactions.iter().collect();
    ordered.sort_by_key(|interaction| interaction.timestamp_us);

    let mut steps: Vec<ConversationStep> = Vec::new();
    let mut seen = SeenSteps::new(options.dedup);
    let mut duplicate_count = 0usize;
    let mut error_count = 0usize;

    for interaction in &ordered {
        if !interaction.success {
            error_count += 1;
            steps.push(error_step(interaction));
            continue;
        }

        let history = message_history(interaction);
        if history.is_empty() {
            tracing::trace!(
                timestamp_us = interaction.timestamp_us,
                "interaction yielded no message history, skipping"
            );
            continue;
        }

        if is_summarization(&history) {
            if let Some(step) = summarization_step(interaction, &history) {
                if seen.admit(&step) {
                    steps.push(step);
                } else {
                    duplicate_count += 1;
                }
            }
            continue;
        }

        // Every assistant message in the cumulative history, not just the
        // last one; the seen-set suppresses the re-sent portion.
        for message in &history {
            if message.role != MessageRole::Assistant {
                continue;
            }
            let Some(text) = message.text() else {
                continue;
            };
            let sections = parse_react(&text);
            for candidate in candidate_steps(&sections, interaction, invocations, options) {
                if seen.admit(&candidate) {
                    steps.push(candidate);
                } else {
                    duplicate_count += 1;
                }
            }
        }
    }

    if steps.is_empty() && status == StageStatus::Active {
        let timestamp_us = ordered
            .first()
            .map(|interaction| interaction.timestamp_us)
            .unwrap_or(0);
        steps.push(ConversationStep::new(
            StepKind::Thought,
            STAGE_STARTING_PLACEHOLDER,
            timestamp_us,
        ));
    }

    tracing::debug!(
        interactions = ordered.len(),
        steps = steps.len(),
        duplicates = duplicate_count,
        errors = error_count,
        "stage conversation built"
    );

    let metadata = StageMetadata {
        interaction_count: ordered.len(),
        step_count: steps.len(),
        error_count,
        duplicate_count,
    };
    StageConversation { steps, metadata }
}

/// Extract an interaction's message history.
///
/// Prefers the structured `conversation` field and falls back to the flat
/// `messages` field. Either may be a JSON array of message objects, an object
/// wrapping such an array, or a single constructor-notation string.
pub fn message_history(interaction: &LlmInteraction) -> Vec<RawMessage> {
    if let Some(conversation) = &interaction.conversation {
        let messages = decode_history_value(conversation);
        if !messages.is_empty() {
            return messages;
        }
    }
    if let Some(messages) = &interaction.messages {
        return decode_history_value(messages);
    }
    Vec::new()
}

// ============================================================================
// INTERNAL: HISTORY DECODING
// ============================================================================

fn decode_history_value(value: &JsonValue) -> Vec<RawMessage> {
    match value {
        JsonValue::Array(items) => items
            .iter()
            .filter_map(|item| match serde_json::from_value::<RawMessage>(item.clone()) {
                Ok(message) => Some(message),
                Err(error) => {
                    tracing::debug!(%error, "dropping undecodable history entry");
                    None
                }
            })
            .collect(),
        JsonValue::String(s) => pyrepr::decode_messages(s)
            .into_iter()
            .map(|decoded| RawMessage {
                role: MessageRole::from_str_normalized(&decoded.role),
                content: JsonValue::String(decoded.content),
            })
            .collect(),
        JsonValue::Object(obj) => obj
            .get("messages")
            .map(decode_history_value)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

// ============================================================================
// INTERNAL: STEP CONSTRUCTION
// ============================================================================

fn error_step(interaction: &LlmInteraction) -> ConversationStep {
    let message = interaction
        .error_message
        .clone()
        .unwrap_or_else(|| "LLM call failed".to_string());
    let mut step = ConversationStep::new(StepKind::Error, message.clone(), interaction.timestamp_us);
    step.success = false;
    step.error_message = Some(message);
    step
}

fn is_summarization(history: &[RawMessage]) -> bool {
    history
        .iter()
        .filter(|message| message.role == MessageRole::System)
        .filter_map(|message| message.text())
        .any(|text| {
            let lowered = text.to_lowercase();
            SUMMARIZATION_MARKERS
                .iter()
                .any(|marker| lowered.contains(marker))
        })
}

/// Wrap the last assistant message as a single summarization step.
/// Summarization output is prose, not ReAct-formatted; it is taken verbatim.
fn summarization_step(
    interaction: &LlmInteraction,
    history: &[RawMessage],
) -> Option<ConversationStep> {
    let last = history
        .iter()
        .rev()
        .find(|message| message.role == MessageRole::Assistant)?;
    let text = last.text()?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(ConversationStep::new(
        StepKind::Summarization,
        trimmed,
        interaction.timestamp_us,
    ))
}

fn candidate_steps(
    sections: &ReactSections,
    interaction: &LlmInteraction,
    invocations: &[ToolInvocation],
    options: &BuilderOptions,
) -> Vec<ConversationStep> {
    let mut steps = Vec::new();
    if let Some(thought) = &sections.thought {
        steps.push(ConversationStep::new(
            StepKind::Thought,
            thought,
            interaction.timestamp_us,
        ));
    }
    if let Some(action) = &sections.action {
        steps.push(action_step(
            action,
            sections.action_input.as_deref(),
            interaction,
            invocations,
            options,
        ));
    }
    if let Some(answer) = &sections.final_answer {
        steps.push(ConversationStep::new(
            StepKind::Analysis,
            answer,
            interaction.timestamp_us,
        ));
    }
    steps
}

fn action_step(
    action: &str,
    input: Option<&str>,
    interaction: &LlmInteraction,
    invocations: &[ToolInvocation],
    options: &BuilderOptions,
) -> ConversationStep {
    let content = match input {
        Some(input) => format!("{action} {input}"),
        None => action.to_string(),
    };
    let mut step = ConversationStep::new(StepKind::Action, content, interaction.timestamp_us);

    let (_, tool) = split_action(action);
    step.action_name = Some(tool.to_string());
    step.action_input = input.map(String::from);

    // Best-effort: an action with no matching invocation renders with an
    // empty result, which the display layer shows as pending.
    if let Some(found) = find_action_result(
        action,
        interaction.timestamp_us,
        invocations,
        &options.correlation,
    ) {
        step.action_result = Some(found.payload);
        step.success = found.success;
    }
    step
}
