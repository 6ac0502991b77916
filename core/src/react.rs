//! ReAct section extraction.
//!
//! Splits one agent message into named sections: thought, action, action
//! input, final answer. Models emit these with loose formatting — headers
//! with or without colons, a final answer appended mid-line right after a
//! sentence, or no headers at all when the model skips the format and writes
//! a direct answer — so extraction runs three passes in order:
//!
//! 1. **Colon form**: `Header:` at a line start or after terminal
//!    punctuation; content runs to the next recognized header.
//! 2. **Bare form**: header alone on its own line, content on the following
//!    lines. Only attempted when the colon form yields nothing.
//! 3. **Headerless fallback**: sufficiently long content with no header
//!    anywhere is treated as a direct final answer.
//!
//! No section is fabricated when its header is absent.

use std::sync::OnceLock;

use regex::Regex;

/// Sections recovered from one ReAct-formatted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReactSections {
    pub thought: Option<String>,
    pub action: Option<String>,
    pub action_input: Option<String>,
    pub final_answer: Option<String>,
}

impl ReactSections {
    pub fn is_empty(&self) -> bool {
        self.thought.is_none()
            && self.action.is_none()
            && self.action_input.is_none()
            && self.final_answer.is_none()
    }

    /// Record the first non-empty occurrence of a header's content.
    fn assign(&mut self, header: Header, content: &str) {
        let content = content.trim();
        if content.is_empty() {
            return;
        }
        let slot = match header {
            Header::Thought => &mut self.thought,
            Header::Action => &mut self.action,
            Header::ActionInput => &mut self.action_input,
            Header::FinalAnswer => &mut self.final_answer,
        };
        if slot.is_none() {
            *slot = Some(content.to_string());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Header {
    Thought,
    Action,
    ActionInput,
    FinalAnswer,
}

impl Header {
    fn from_token(token: &str) -> Option<Self> {
        let mut key = token.to_lowercase();
        key.retain(|c| !c.is_whitespace());
        Some(match key.as_str() {
            "thought" => Self::Thought,
            "action" => Self::Action,
            "actioninput" => Self::ActionInput,
            "finalanswer" => Self::FinalAnswer,
            _ => return None,
        })
    }
}

/// Minimum content length for the headerless final-answer fallback.
const BARE_ANSWER_MIN_LEN: usize = 50;

const HEADER_TOKENS: &[&str] = &["thought", "action", "action input", "final answer"];

/// Colon-form headers: at string start, after a newline, or after terminal
/// punctuation plus whitespace (models append `Final Answer:` directly after
/// a sentence without a line break; an unlabeled inline marker also truncates
/// the running section).
fn colon_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:^|\n|[.!?][ \t])[ \t]*(?P<h>thought|action[ \t]+input|action|final[ \t]+answer)[ \t]*:",
        )
        .expect("invalid colon header regex")
    })
}

/// Bare headers: the token alone on its own line, no colon.
fn bare_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^[ \t]*(?P<h>thought|action[ \t]+input|action|final[ \t]+answer)[ \t]*\r?$")
            .expect("invalid bare header regex")
    })
}

/// Extract ReAct sections from one message's content.
pub fn parse_react(content: &str) -> ReactSections {
    let mut sections = scan_headers(content, colon_header_regex());

    if sections.is_empty() {
        // Some models omit the colon; the header must then stand alone on
        // its own line with content starting on the next.
        sections = scan_headers(content, bare_header_regex());
    }

    if sections.is_empty()
        && !colon_header_regex().is_match(content)
        && !bare_header_regex().is_match(content)
    {
        let trimmed = content.trim();
        if trimmed.chars().count() > BARE_ANSWER_MIN_LEN && !loosely_matches_header(trimmed) {
            // The model skipped ReAct formatting and wrote a direct answer.
            sections.final_answer = Some(trimmed.to_string());
        }
    }

    sections
}

/// Find all header occurrences and slice the content runs between them.
fn scan_headers(content: &str, regex: &Regex) -> ReactSections {
    // (header, content start, header token start) in document order
    let boundaries: Vec<(Header, usize, usize)> = regex
        .captures_iter(content)
        .filter_map(|caps| {
            let token = caps.name("h")?;
            let whole = caps.get(0)?;
            Some((Header::from_token(token.as_str())?, whole.end(), token.start()))
        })
        .collect();

    let mut sections = ReactSections::default();
    for (index, (header, content_start, _)) in boundaries.iter().enumerate() {
        let end = boundaries
            .get(index + 1)
            .map(|(_, _, next_token_start)| *next_token_start)
            .unwrap_or(content.len());
        sections.assign(*header, &content[*content_start..end]);
    }
    sections
}

/// Whether trimmed content is nothing but a header token (with or without a
/// trailing colon). Such content is a formatting artifact, not an answer.
fn loosely_matches_header(trimmed: &str) -> bool {
    let lowered = trimmed
        .trim_end_matches(':')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    HEADER_TOKENS.contains(&lowered.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_four_sections_extracted() {
        let sections = parse_react(
            "Thought: X\nAction: Y\nAction Input: Z\nFinal Answer: W",
        );
        assert_eq!(sections.thought.as_deref(), Some("X"));
        assert_eq!(sections.action.as_deref(), Some("Y"));
        assert_eq!(sections.action_input.as_deref(), Some("Z"));
        assert_eq!(sections.final_answer.as_deref(), Some("W"));
    }

    #[test]
    fn test_multiline_section_content() {
        let sections = parse_react(
            "Thought: the pod is crash-looping\nand the logs show OOM kills\nAction: kubectl.describe_pod\nAction Input: pod=api-7f9\nnamespace=prod",
        );
        assert_eq!(
            sections.thought.as_deref(),
            Some("the pod is crash-looping\nand the logs show OOM kills")
        );
        assert_eq!(sections.action.as_deref(), Some("kubectl.describe_pod"));
        assert_eq!(
            sections.action_input.as_deref(),
            Some("pod=api-7f9\nnamespace=prod")
        );
        assert!(sections.final_answer.is_none());
    }

    #[test]
    fn test_headers_case_insensitive() {
        let sections = parse_react("THOUGHT: upper\nfinal answer: lower");
        assert_eq!(sections.thought.as_deref(), Some("upper"));
        assert_eq!(sections.final_answer.as_deref(), Some("lower"));
    }

    #[test]
    fn test_headerless_long_content_is_final_answer() {
        let content = "The cluster is healthy; all deployments have the expected replica counts.";
        let sections = parse_react(content);
        assert_eq!(sections.final_answer.as_deref(), Some(content));
        assert!(sections.thought.is_none());
        assert!(sections.action.is_none());
        assert!(sections.action_input.is_none());
    }

    #[test]
    fn test_headerless_short_content_yields_nothing() {
        let sections = parse_react("ok");
        assert!(sections.is_empty());
    }

    #[test]
    fn test_bare_header_token_yields_nothing() {
        assert!(parse_react("Final Answer").is_empty());
        assert!(parse_react("Thought:").is_empty());
    }

    #[test]
    fn test_bare_headers_without_colons() {
        let sections = parse_react("Thought\nthe service mesh is misrouting\nAction\nistio.get_routes");
        assert_eq!(
            sections.thought.as_deref(),
            Some("the service mesh is misrouting")
        );
        assert_eq!(sections.action.as_deref(), Some("istio.get_routes"));
    }

    #[test]
    fn test_inline_final_answer_after_sentence() {
        let sections = parse_react(
            "Thought: I have checked every node and found no pressure. Final Answer: The nodes are fine.",
        );
        assert_eq!(
            sections.thought.as_deref(),
            Some("I have checked every node and found no pressure.")
        );
        assert_eq!(sections.final_answer.as_deref(), Some("The nodes are fine."));
    }

    #[test]
    fn test_inline_action_truncates_thought() {
        let sections =
            parse_react("Thought: logs first. Action: kubectl.get_logs\nAction Input: pod=a");
        assert_eq!(sections.thought.as_deref(), Some("logs first."));
        assert_eq!(sections.action.as_deref(), Some("kubectl.get_logs"));
        assert_eq!(sections.action_input.as_deref(), Some("pod=a"));
    }

    #[test]
    fn test_no_cross_contamination() {
        let sections = parse_react("Action: restart_service\nAction Input: name=ingress");
        assert!(sections.thought.is_none());
        assert!(sections.final_answer.is_none());
        assert_eq!(sections.action.as_deref(), Some("restart_service"));
        assert_eq!(sections.action_input.as_deref(), Some("name=ingress"));
    }

    #[test]
    fn test_repeated_header_keeps_first_occurrence() {
        let sections = parse_react("Thought: first\nThought: second\nFinal Answer: done");
        assert_eq!(sections.thought.as_deref(), Some("first"));
        assert_eq!(sections.final_answer.as_deref(), Some("done"));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_react("").is_empty());
        assert!(parse_react("   \n  ").is_empty());
    }
}
