//! StageView conversation parsing core.
//!
//! Recovers a clean, de-duplicated, typed sequence of conversation steps from
//! the raw records of an AI-agent investigation session: ReAct-style
//! "Thought/Action/Final Answer" text, constructor-notation (Python repr)
//! message lists, JSON-wrapped tool results, and YAML/text blobs. The
//! dashboard's rendering layer consumes the output in-process; this crate has
//! no I/O, no shared state, and no wire protocol of its own.
//!
//! # Core Types
//!
//! - [`LlmInteraction`] / [`ToolInvocation`] - raw input records per stage
//! - [`ConversationStep`] / [`StepKind`] - the ordered display timeline
//! - [`Classification`] / [`ParsedSection`] - generic display of raw values
//!
//! # Pipeline
//!
//! - [`build_stage_conversation`] - records in, deduplicated steps out
//! - [`parse_react`] - section extraction from one agent message
//! - [`decode_messages`] - constructor-notation message-list decoding
//! - [`classify`] - ordered classification of arbitrary raw values
//! - [`find_action_result`] - time-window action/tool correlation
//!
//! Every entry point is pure and total: malformed input degrades to a
//! less-structured interpretation (worst case plain text, or a stage with
//! fewer recovered steps), never an error to the caller.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use stageview_core::{
//!     BuilderOptions, LlmInteraction, StageStatus, StepKind, build_stage_conversation,
//! };
//!
//! let interaction: LlmInteraction = serde_json::from_value(json!({
//!     "timestamp_us": 1_000_000,
//!     "success": true,
//!     "messages": [{
//!         "role": "assistant",
//!         "content": "Thought: check the pods\nFinal Answer: All pods are running."
//!     }]
//! }))
//! .unwrap();
//!
//! let stage = build_stage_conversation(
//!     &[interaction],
//!     &[],
//!     StageStatus::Completed,
//!     &BuilderOptions::default(),
//! );
//! assert_eq!(stage.steps.len(), 2);
//! assert_eq!(stage.steps[0].kind, StepKind::Thought);
//! assert_eq!(stage.steps[1].kind, StepKind::Analysis);
//! ```

// ============================================================================
// MODULES
// ============================================================================

/// Mixed-content classification into tagged display sections.
pub mod classify;

/// Stage conversation pipeline: records in, deduplicated steps out.
pub mod conversation;

/// Action-to-tool-result correlation.
pub mod correlate;

/// Constructor-notation (Python repr) message-list decoding.
pub mod pyrepr;

/// ReAct section extraction.
pub mod react;

mod error;
mod types;

// ============================================================================
// PUBLIC API
// ============================================================================

pub use classify::{Classification, classify, classify_text};

pub use conversation::{
    BuilderOptions, DedupOptions, StageConversation, StageMetadata, StageStatus,
    build_stage_conversation, message_history,
};

pub use correlate::{ActionResult, CorrelationOptions, find_action_result};

pub use error::ParseError;

pub use pyrepr::{DecodedMessage, decode_messages, looks_like_message_list, try_decode_messages};

pub use react::{ReactSections, parse_react};

pub use types::{
    CommunicationKind, ConversationStep, LlmInteraction, MessageRole, ParsedSection, RawMessage,
    SectionKind, StepKind, ToolInvocation,
};
