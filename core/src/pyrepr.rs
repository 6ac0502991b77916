//! Constructor-notation (Python repr) message-list decoding.
//!
//! Python agent frameworks sometimes record a call's message history with
//! `str()` on a list of message objects instead of JSON, producing
//! constructor-call notation:
//!
//! ```text
//! [LLMMessage(role='system', content='You are helpful.'), LLMMessage(role='user', content='Hi')]
//! ```
//!
//! This module recovers ordered `{role, content}` pairs from that notation.
//! Content values routinely contain unescaped apostrophes (`it's`), so the
//! terminating quote cannot be found with a regex: a two-state scanner
//! (Normal/Escaped) walks the value and accepts a quote as terminating only
//! when the lookahead resembles the constructor-argument grammar — `)`, a
//! `, keyword=` continuation, or the end of the fragment.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ParseError;

/// One decoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub role: String,
    pub content: String,
}

/// Leading `[Ctor(` shape; the captured identifier is the constructor token.
fn ctor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[\s*(?P<ctor>[A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("invalid ctor regex")
    })
}

fn role_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"role\s*=\s*'(?P<role>[^']*)'").expect("invalid role regex"))
}

fn content_start_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"content\s*=\s*'").expect("invalid content start regex"))
}

/// `identifier=` — the start of the next keyword argument.
fn kwarg_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\s*=").expect("invalid kwarg regex"))
}

/// Check whether a string looks like a constructor-notation message list.
pub fn looks_like_message_list(s: &str) -> bool {
    let trimmed = s.trim_start();
    trimmed.contains("role=") && ctor_regex().is_match(trimmed)
}

/// Decode a constructor-notation message list, returning an empty list when
/// nothing decodes. Callers fall back to plain-text rendering on empty.
pub fn decode_messages(s: &str) -> Vec<DecodedMessage> {
    match try_decode_messages(s) {
        Ok(messages) => messages,
        Err(error) => {
            tracing::debug!(%error, "constructor-notation decode declined");
            Vec::new()
        }
    }
}

/// Decode a constructor-notation message list, reporting why decoding
/// declined instead of returning an empty list.
pub fn try_decode_messages(s: &str) -> Result<Vec<DecodedMessage>, ParseError> {
    let trimmed = s.trim();
    if !looks_like_message_list(trimmed) {
        return Err(ParseError::NotMessageList);
    }
    let ctor = ctor_regex()
        .captures(trimmed)
        .and_then(|caps| caps.name("ctor"))
        .ok_or(ParseError::NotMessageList)?
        .as_str();
    let token = format!("{ctor}(");

    // Each fragment is everything after one `Ctor(` up to the next.
    let mut messages = Vec::new();
    for fragment in trimmed.split(token.as_str()).skip(1) {
        // A fragment without a role contributes no message; it does not fail
        // the whole parse.
        let Some(role) = role_regex()
            .captures(fragment)
            .and_then(|caps| caps.name("role").map(|m| m.as_str().to_string()))
        else {
            continue;
        };
        let content = extract_content(fragment).unwrap_or_default();
        messages.push(DecodedMessage { role, content });
    }

    if messages.is_empty() {
        return Err(ParseError::EmptyDecode);
    }
    Ok(messages)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    Escaped,
}

/// Scan the single-quoted content value out of one constructor fragment,
/// resolving escape sequences as it goes.
fn extract_content(fragment: &str) -> Option<String> {
    let start = content_start_regex().find(fragment)?.end();
    let value = &fragment[start..];

    let mut out = String::with_capacity(value.len());
    let mut state = ScanState::Normal;

    for (index, ch) in value.char_indices() {
        match state {
            ScanState::Escaped => {
                out.push(resolve_escape(ch));
                state = ScanState::Normal;
            }
            ScanState::Normal => match ch {
                '\\' => state = ScanState::Escaped,
                '\'' => {
                    if is_content_terminator(&value[index + 1..]) {
                        return Some(out);
                    }
                    // Interior apostrophe, part of the content.
                    out.push('\'');
                }
                _ => out.push(ch),
            },
        }
    }

    // Ran off the end of the fragment: the fragment boundary itself
    // terminates (the split consumed the next constructor token).
    Some(out)
}

/// Lookahead after a candidate closing quote. The quote is real when the
/// remainder looks like the end of the constructor-argument list.
fn is_content_terminator(rest: &str) -> bool {
    let rest = rest.trim_start();
    if rest.is_empty() || rest.starts_with(')') {
        return true;
    }
    if let Some(after_comma) = rest.strip_prefix(',') {
        let after_comma = after_comma.trim_start();
        return after_comma.is_empty() || kwarg_regex().is_match(after_comma);
    }
    false
}

fn resolve_escape(ch: char) -> char {
    match ch {
        'n' => '\n',
        't' => '\t',
        // `\'`, `\"`, `\\` resolve to the character itself; unknown escapes
        // keep the escaped character.
        _ => ch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(s: &str) -> Vec<DecodedMessage> {
        decode_messages(s)
    }

    #[test]
    fn test_two_messages_in_order() {
        let messages = decode(
            "[LLMMessage(role='system', content='You are helpful.'), LLMMessage(role='user', content='Hi')]",
        );
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, "You are helpful.");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "Hi");
    }

    #[test]
    fn test_escape_sequences_resolved() {
        let messages =
            decode(r"[Msg(role='assistant', content='line one\nline two\tindented\\done')]");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "line one\nline two\tindented\\done");
    }

    #[test]
    fn test_escaped_quotes_resolved() {
        let messages = decode(r#"[Msg(role='user', content='she said \"hi\" and \'bye\'')]"#);
        assert_eq!(messages[0].content, r#"she said "hi" and 'bye'"#);
    }

    #[test]
    fn test_interior_apostrophe_is_content() {
        let messages = decode("[Msg(role='assistant', content='it's the scheduler's fault')]");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "it's the scheduler's fault");
    }

    #[test]
    fn test_trailing_keyword_argument_terminates_content() {
        let messages = decode("[Msg(role='user', content='check the pods', cached=True)]");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "check the pods");
    }

    #[test]
    fn test_fragment_without_role_is_skipped() {
        let messages = decode(
            "[Msg(content='orphan'), Msg(role='user', content='kept')]",
        );
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content, "kept");
    }

    #[test]
    fn test_not_a_message_list() {
        assert_eq!(
            try_decode_messages("plain text"),
            Err(ParseError::NotMessageList)
        );
        assert_eq!(
            try_decode_messages("[1, 2, 3]"),
            Err(ParseError::NotMessageList)
        );
        // role= present but no leading constructor call
        assert_eq!(
            try_decode_messages("role='user' floating"),
            Err(ParseError::NotMessageList)
        );
        assert!(decode("plain text").is_empty());
    }

    #[test]
    fn test_nothing_decoded_is_empty_not_error() {
        // Trigger shape matches (role= appears in content text) but no
        // fragment carries a quoted role argument.
        let input = "[Msg(note='set role=admin later')]";
        assert_eq!(try_decode_messages(input), Err(ParseError::EmptyDecode));
        assert!(decode(input).is_empty());
    }

    #[test]
    fn test_role_only_fragment_yields_empty_content() {
        let messages = decode("[Msg(role='user')]");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "");
    }

    #[test]
    fn test_decode_is_idempotent_through_reencode() {
        let original = vec![
            DecodedMessage {
                role: "system".to_string(),
                content: "first line\nsecond 'quoted' line".to_string(),
            },
            DecodedMessage {
                role: "user".to_string(),
                content: "tab\there".to_string(),
            },
        ];
        let encoded = reencode(&original);
        let decoded = decode(&encoded);
        assert_eq!(decoded, original);

        // A second decode of the re-encoded form is identical.
        let decoded_again = decode(&reencode(&decoded));
        assert_eq!(decoded_again, original);
    }

    /// Serialize messages back into constructor notation, escaping the way
    /// Python's repr does.
    fn reencode(messages: &[DecodedMessage]) -> String {
        let body: Vec<String> = messages
            .iter()
            .map(|m| {
                let escaped = m
                    .content
                    .replace('\\', "\\\\")
                    .replace('\'', "\\'")
                    .replace('\n', "\\n")
                    .replace('\t', "\\t");
                format!("Msg(role='{}', content='{}')", m.role, escaped)
            })
            .collect();
        format!("[{}]", body.join(", "))
    }
}
