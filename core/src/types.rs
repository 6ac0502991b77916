//! Core type definitions.
//!
//! Boundary types for the conversation parsing pipeline. Input records come
//! from the session-fetching layer; output steps and sections go to the
//! rendering layer. These types have no application-specific dependencies and
//! tolerate absent optional fields.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ============================================================================
// ROLES & MESSAGES
// ============================================================================

/// Standard chat roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    #[default]
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }

    /// Try to parse a role string, returning None for unknown roles.
    ///
    /// Supports role names from multiple agent frameworks:
    /// - OpenAI: system, user, assistant, tool, function, developer
    /// - LangChain/LangGraph: human, ai, tool
    /// - Google: user, model
    pub fn try_from_str(s: &str) -> Option<Self> {
        Some(match s.to_lowercase().as_str() {
            "system" | "developer" => Self::System,
            "user" | "human" => Self::User,
            "assistant" | "ai" | "bot" | "model" => Self::Assistant,
            "tool" | "function" => Self::Tool,
            _ => return None,
        })
    }

    /// Normalize a role string, defaulting to User for unknown roles.
    pub fn from_str_normalized(s: &str) -> Self {
        Self::try_from_str(s).unwrap_or(Self::User)
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Roles come from records written by many frameworks; an unknown role string
// must not fail the whole record, so deserialization goes through the
// normalizing parser instead of a strict enum match.
impl<'de> Deserialize<'de> for MessageRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_str_normalized(&s))
    }
}

/// One message from an LLM call record.
///
/// `content` is either a plain string or a structured value (provider content
/// block arrays, wrapped objects). The role is read from the record, never
/// inferred from content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub role: MessageRole,
    #[serde(default)]
    pub content: JsonValue,
}

impl RawMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: JsonValue::String(content.into()),
        }
    }

    /// Extract display text from the content value.
    ///
    /// Handles plain strings, arrays of text-bearing blocks, and objects
    /// wrapping a `text`/`content` string field. Returns None when no text
    /// can be recovered.
    pub fn text(&self) -> Option<String> {
        content_text(&self.content)
    }
}

fn content_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Array(arr) => {
            let texts: Vec<String> = arr.iter().filter_map(block_text).collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join("\n"))
            }
        }
        JsonValue::Object(obj) => obj
            .get("text")
            .or_else(|| obj.get("content"))
            .and_then(|v| v.as_str())
            .map(String::from),
        _ => None,
    }
}

fn block_text(block: &JsonValue) -> Option<String> {
    match block {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Object(obj) => obj.get("text").and_then(|t| t.as_str()).map(String::from),
        _ => None,
    }
}

// ============================================================================
// INPUT RECORDS
// ============================================================================

/// One LLM call within a stage.
///
/// `conversation` and `messages` both hold the call's message history; the
/// structured `conversation` field is preferred, the flat `messages` field is
/// the fallback. Either may be a JSON array of message objects or a single
/// string that itself needs constructor-notation decoding. The history is
/// cumulative: each record repeats everything sent in prior calls plus the
/// new turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmInteraction {
    /// Monotonic microsecond timestamp of the model call.
    pub timestamp_us: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<JsonValue>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<i64>,
}

/// Kind of recorded tool communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationKind {
    ToolCall,
    ToolList,
}

/// One recorded tool (MCP) invocation.
///
/// Invocations are recorded on an independent stream, asynchronously
/// interleaved with LLM calls by wall-clock time; there is no foreign key
/// back to the action text that requested them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Monotonic microsecond timestamp of the invocation.
    pub timestamp_us: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    pub tool_name: String,
    #[serde(rename = "communication_kind")]
    pub kind: CommunicationKind,
    #[serde(default)]
    pub parameters: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_tools: Option<JsonValue>,
    pub success: bool,
}

// ============================================================================
// OUTPUT: CONVERSATION STEPS
// ============================================================================

/// Kind of a conversation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Thought,
    Action,
    Analysis,
    Summarization,
    Error,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Thought => "thought",
            Self::Action => "action",
            Self::Analysis => "analysis",
            Self::Summarization => "summarization",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One display step in a stage's conversation timeline.
///
/// Created exclusively by the stage builder and never mutated afterwards.
/// Steps have no persistent identity across rebuilds; equality of kind and
/// content is what deduplication and upstream reconciliation key on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationStep {
    pub kind: StepKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_result: Option<JsonValue>,
    pub timestamp_us: i64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ConversationStep {
    /// A successful step with no action fields; the builder fills the rest.
    pub(crate) fn new(kind: StepKind, content: impl Into<String>, timestamp_us: i64) -> Self {
        Self {
            kind,
            content: content.into(),
            action_name: None,
            action_input: None,
            action_result: None,
            timestamp_us,
            success: true,
            error_message: None,
        }
    }
}

// ============================================================================
// OUTPUT: PARSED SECTIONS
// ============================================================================

/// Presentation kind of a parsed section. Renderers switch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    Json,
    Yaml,
    Code,
    Text,
    SystemPrompt,
    UserPrompt,
    AssistantPrompt,
}

/// One display section recovered from an arbitrary raw value.
///
/// Transient: drives a single rendering pass and is not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedSection {
    /// Deterministic short id derived from the section content.
    pub id: String,
    pub title: String,
    pub kind: SectionKind,
    pub content: String,
    /// The original text this section was recovered from.
    pub raw_text: String,
}

impl ParsedSection {
    pub fn new(
        title: impl Into<String>,
        kind: SectionKind,
        content: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        let content = content.into();
        let raw_text = raw_text.into();
        Self {
            id: compute_short_hash(&content),
            title: title.into(),
            kind,
            content,
            raw_text,
        }
    }
}

// ============================================================================
// SYNTHETIC IDS
// ============================================================================

/// FNV-1a hash constants (32-bit).
///
/// FNV-1a is a simple, non-cryptographic hash that's deterministic across
/// processes and platforms. Used for generating synthetic section ids.
const FNV_OFFSET_BASIS: u32 = 2166136261;
const FNV_PRIME: u32 = 16777619;

fn fnv1a_hash(data: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in data {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Compute a short hash string (8 hex chars) for section content.
///
/// Deterministic across process restarts, so section ids are stable for
/// identical content between rendering passes.
fn compute_short_hash(content: &str) -> String {
    format!("{:08x}", fnv1a_hash(content.as_bytes()))
}
