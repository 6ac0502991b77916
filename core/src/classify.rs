//! Mixed-content classification.
//!
//! Tool results and message payloads arrive in wildly different shapes:
//! JSON strings wrapped in a `result` envelope, YAML manifests, fenced
//! markdown, constructor-notation message lists, or plain prose.
//! Classification is an explicit ordered chain of attempts producing one
//! tagged [`Classification`]; a parse failure anywhere makes that attempt
//! decline and falls through to the next, least-structured interpretation —
//! nothing propagates to the caller.
//!
//! # Decision order
//!
//! 1. Object with a single string `result` field → JSON-parse the string;
//!    structured values get long-text fields broken out into their own
//!    sections plus a raw-JSON section, scalars get one JSON section, and
//!    unparseable strings go through YAML/long-text heuristics before being
//!    reclassified as a plain string.
//! 2. Constructor-notation message list → one section per decoded message,
//!    typed by role.
//! 3. String parsing as pure JSON → `Json`, not sectioned.
//! 4. Fenced code blocks or markdown markers → fenced blocks as sections,
//!    surrounding prose as text.
//! 5. Plain text.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value as JsonValue;

use crate::pyrepr::{self, DecodedMessage};
use crate::types::{ParsedSection, SectionKind};

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Tagged classification of an arbitrary raw value.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Pure structured JSON, not sectioned.
    Json(JsonValue),
    /// YAML-looking text.
    Yaml(String),
    /// Generic plain text.
    Text(String),
    /// Decoded constructor-notation message list, one section per message.
    MessageList(Vec<ParsedSection>),
    /// Mixed content: ordered sections (long-text fields, fenced blocks,
    /// surrounding prose, raw JSON).
    Mixed(Vec<ParsedSection>),
}

impl Classification {
    /// Render the classification to the ordered section list consumed by the
    /// display layer. Empty only for empty text.
    pub fn sections(&self) -> Vec<ParsedSection> {
        match self {
            Self::Json(value) => {
                let raw = value.to_string();
                vec![json_section("JSON", value, &raw)]
            }
            Self::Yaml(text) => vec![ParsedSection::new("YAML", SectionKind::Yaml, text, text)],
            Self::Text(text) => {
                if text.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![ParsedSection::new("Text", SectionKind::Text, text, text)]
                }
            }
            Self::MessageList(sections) | Self::Mixed(sections) => sections.clone(),
        }
    }
}

/// Minimum length for a leaf string field to get its own formatted section.
const LONG_TEXT_MIN_LEN: usize = 200;

/// Minimum length for unparseable result text to count as a generic text blob.
const GENERIC_TEXT_MIN_LEN: usize = 50;

const YAML_MARKERS: &[&str] = &["apiVersion:", "kind:", "metadata:"];

// ============================================================================
// PUBLIC API
// ============================================================================

/// Classify an arbitrary raw value (already-decoded object or string).
pub fn classify(value: &JsonValue) -> Classification {
    if let Some(inner) = single_result_field(value) {
        return classify_result_string(inner);
    }
    if let Some(s) = value.as_str() {
        return classify_text(s);
    }
    // Already-structured values need no text heuristics.
    Classification::Json(value.clone())
}

/// Classify a raw string (decision steps 2–5).
pub fn classify_text(s: &str) -> Classification {
    if pyrepr::looks_like_message_list(s) {
        let decoded = pyrepr::decode_messages(s);
        if !decoded.is_empty() {
            return Classification::MessageList(message_sections(&decoded));
        }
    }
    if let Ok(value) = serde_json::from_str::<JsonValue>(s) {
        return Classification::Json(value);
    }
    if let Some(sections) = markdown_sections(s) {
        return Classification::Mixed(sections);
    }
    Classification::Text(s.to_string())
}

// ============================================================================
// RESULT-ENVELOPE HANDLING
// ============================================================================

/// The `{"result": "<string>"}` envelope written by the tool-recording layer.
fn single_result_field(value: &JsonValue) -> Option<&str> {
    let obj = value.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    obj.get("result")?.as_str()
}

fn classify_result_string(raw: &str) -> Classification {
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(parsed) if parsed.is_object() || parsed.is_array() => {
            Classification::Mixed(structured_sections(&parsed, raw))
        }
        Ok(scalar) => Classification::Mixed(vec![json_section("Result", &scalar, raw)]),
        Err(error) => {
            tracing::trace!(%error, "result field is not JSON, trying text heuristics");
            if looks_like_yaml(raw) {
                return Classification::Yaml(raw.to_string());
            }
            let is_multiline = raw.contains('\n') || raw.contains('\t');
            if is_multiline && raw.chars().count() > GENERIC_TEXT_MIN_LEN {
                return Classification::Text(raw.to_string());
            }
            classify_text(raw)
        }
    }
}

/// Sections for a structured result value: every long multi-line leaf string
/// becomes its own formatted section (titled by its dotted key path), then
/// one raw-JSON section for the whole value.
fn structured_sections(parsed: &JsonValue, raw: &str) -> Vec<ParsedSection> {
    let mut sections = Vec::new();
    let mut path = Vec::new();
    collect_long_text_fields(parsed, &mut path, &mut sections);
    sections.push(json_section("Raw JSON", parsed, raw));
    sections
}

fn collect_long_text_fields(
    value: &JsonValue,
    path: &mut Vec<String>,
    out: &mut Vec<ParsedSection>,
) {
    match value {
        JsonValue::String(s) if !path.is_empty() && is_long_text(s) => {
            out.push(ParsedSection::new(
                field_title(path),
                SectionKind::Text,
                s,
                s,
            ));
        }
        JsonValue::Object(obj) => {
            for (key, child) in obj {
                path.push(key.clone());
                collect_long_text_fields(child, path, out);
                path.pop();
            }
        }
        JsonValue::Array(arr) => {
            for (index, child) in arr.iter().enumerate() {
                path.push(index.to_string());
                collect_long_text_fields(child, path, out);
                path.pop();
            }
        }
        _ => {}
    }
}

fn is_long_text(s: &str) -> bool {
    s.contains('\n') && s.chars().count() >= LONG_TEXT_MIN_LEN
}

fn field_title(path: &[String]) -> String {
    let joined = path.join(".").replace('_', " ");
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Text".to_string(),
    }
}

// ============================================================================
// TEXT HEURISTICS
// ============================================================================

/// `key: value` or `- item` line shape.
fn yaml_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[ \t]*(?:-[ \t]+\S|[A-Za-z0-9_.\-/]+:([ \t]|$))")
            .expect("invalid yaml line regex")
    })
}

fn looks_like_yaml(s: &str) -> bool {
    if YAML_MARKERS.iter().any(|marker| s.contains(marker)) {
        return true;
    }
    let lines: Vec<&str> = s.lines().filter(|line| !line.trim().is_empty()).collect();
    if lines.len() < 2 {
        return false;
    }
    let matching = lines
        .iter()
        .filter(|line| yaml_line_regex().is_match(line))
        .count();
    matching * 2 > lines.len()
}

// ============================================================================
// MESSAGE SECTIONS
// ============================================================================

fn message_sections(messages: &[DecodedMessage]) -> Vec<ParsedSection> {
    messages
        .iter()
        .map(|message| {
            let (kind, title) = match message.role.to_lowercase().as_str() {
                "system" => (SectionKind::SystemPrompt, "System Prompt"),
                "assistant" => (SectionKind::AssistantPrompt, "Assistant Prompt"),
                _ => (SectionKind::UserPrompt, "User Prompt"),
            };
            ParsedSection::new(title, kind, &message.content, &message.content)
        })
        .collect()
}

// ============================================================================
// MARKDOWN / FENCED BLOCKS
// ============================================================================

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```([A-Za-z0-9_+\-]*)[ \t]*\r?\n(.*?)```").expect("invalid fence regex")
    })
}

/// Headings or bold emphasis; enough to treat prose as markdown text.
fn markdown_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^#{1,6}[ \t]+\S|\*\*[^*\n]+\*\*").expect("invalid markdown marker regex")
    })
}

fn markdown_sections(s: &str) -> Option<Vec<ParsedSection>> {
    let mut sections = Vec::new();
    let mut cursor = 0usize;
    for caps in fence_regex().captures_iter(s) {
        let Some(whole) = caps.get(0) else { continue };
        push_prose(&s[cursor..whole.start()], &mut sections);
        let lang = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let body = caps.get(2).map(|m| m.as_str()).unwrap_or("").trim();
        sections.push(fenced_section(lang, body, whole.as_str()));
        cursor = whole.end();
    }

    if sections.is_empty() {
        // No fences; emphasis or headings alone still mark this as
        // markdown-shaped prose.
        if markdown_marker_regex().is_match(s) {
            let trimmed = s.trim();
            return Some(vec![ParsedSection::new(
                "Text",
                SectionKind::Text,
                trimmed,
                trimmed,
            )]);
        }
        return None;
    }

    push_prose(&s[cursor..], &mut sections);
    Some(sections)
}

fn push_prose(text: &str, out: &mut Vec<ParsedSection>) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(ParsedSection::new(
            "Text",
            SectionKind::Text,
            trimmed,
            trimmed,
        ));
    }
}

fn fenced_section(lang: &str, body: &str, raw: &str) -> ParsedSection {
    let looks_like_json = lang.eq_ignore_ascii_case("json")
        || (lang.is_empty() && (body.starts_with('{') || body.starts_with('[')));
    if looks_like_json {
        match serde_json::from_str::<JsonValue>(body) {
            Ok(value) => return json_section("JSON", &value, raw),
            Err(error) => {
                tracing::trace!(%error, "fenced block failed JSON validation, keeping as code");
            }
        }
    }
    let title = if lang.is_empty() {
        "Code".to_string()
    } else {
        lang.to_uppercase()
    };
    ParsedSection::new(title, SectionKind::Code, body, raw)
}

fn json_section(title: &str, value: &JsonValue, raw: &str) -> ParsedSection {
    let content = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    ParsedSection::new(title, SectionKind::Json, content, raw)
}
