//! Step similarity and the per-stage seen-set.
//!
//! Each successive LLM call re-transmits the entire prior conversation, so
//! the same thought/action/analysis content reappears across consecutive
//! interactions. Before a candidate step is appended it is compared against
//! every step already accepted within the stage. Similarity is content-based
//! (kind, normalized text, action identity), never positional, and the
//! seen-set is a local accumulator scoped to one build invocation — state is
//! never carried across stages or across calls.

use std::collections::HashSet;

use crate::types::{ConversationStep, StepKind};

use super::types::DedupOptions;

/// Accepted-step record used for similarity comparison.
#[derive(Debug)]
struct SeenEntry {
    kind: StepKind,
    normalized: String,
    action_identity: Option<String>,
}

/// Per-stage accumulator of accepted steps.
#[derive(Debug)]
pub(super) struct SeenSteps {
    options: DedupOptions,
    entries: Vec<SeenEntry>,
}

impl SeenSteps {
    pub fn new(options: DedupOptions) -> Self {
        Self {
            options,
            entries: Vec::new(),
        }
    }

    /// Check a candidate against all accepted steps; record it and return
    /// true when novel, false when it duplicates an accepted step.
    pub fn admit(&mut self, step: &ConversationStep) -> bool {
        let normalized = normalize_content(&step.content);
        let action_identity = action_identity(step);

        let duplicate = self.entries.iter().any(|seen| {
            is_similar(
                seen,
                step.kind,
                &normalized,
                action_identity.as_deref(),
                &self.options,
            )
        });
        if duplicate {
            return false;
        }

        self.entries.push(SeenEntry {
            kind: step.kind,
            normalized,
            action_identity,
        });
        true
    }
}

fn is_similar(
    seen: &SeenEntry,
    kind: StepKind,
    normalized: &str,
    action_identity: Option<&str>,
    options: &DedupOptions,
) -> bool {
    // Different kinds are never duplicates.
    if seen.kind != kind {
        return false;
    }
    // Two actions with the same normalized name+input pair are duplicates
    // regardless of any surrounding thought text.
    if let (Some(a), Some(b)) = (seen.action_identity.as_deref(), action_identity)
        && a == b
    {
        return true;
    }
    if seen.normalized == normalized {
        return true;
    }
    fuzzy_overlap(&seen.normalized, normalized, options)
}

/// Normalized `name input` pair identifying an action step.
fn action_identity(step: &ConversationStep) -> Option<String> {
    if step.kind != StepKind::Action {
        return None;
    }
    let name = step.action_name.as_deref()?;
    let input = step.action_input.as_deref().unwrap_or("");
    Some(normalize_content(&format!("{name} {input}")))
}

/// Lowercase, strip punctuation, collapse whitespace runs to single spaces.
pub(super) fn normalize_content(content: &str) -> String {
    let lowered: String = content
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fuzzy overlap for long content: the shorter side counts as contained when
/// it (or its 80%-length prefix) appears inside the longer, or when enough of
/// its significant words do.
fn fuzzy_overlap(a: &str, b: &str, options: &DedupOptions) -> bool {
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };

    let shorter_len = shorter.chars().count();
    if shorter_len <= options.fuzzy_min_len {
        return false;
    }

    if longer.contains(shorter) {
        return true;
    }

    let prefix_len = (shorter_len as f64 * options.overlap_threshold).ceil() as usize;
    let prefix: String = shorter.chars().take(prefix_len).collect();
    if longer.contains(prefix.as_str()) {
        return true;
    }

    let significant: Vec<&str> = shorter
        .split(' ')
        .filter(|word| word.len() > options.min_word_len)
        .collect();
    if significant.is_empty() {
        return false;
    }
    let longer_words: HashSet<&str> = longer
        .split(' ')
        .filter(|word| word.len() > options.min_word_len)
        .collect();
    let present = significant
        .iter()
        .filter(|word| longer_words.contains(*word))
        .count();
    present as f64 / significant.len() as f64 >= options.overlap_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(kind: StepKind, content: &str) -> ConversationStep {
        ConversationStep::new(kind, content, 0)
    }

    fn action_step(name: &str, input: Option<&str>, content: &str) -> ConversationStep {
        let mut step = step(StepKind::Action, content);
        step.action_name = Some(name.to_string());
        step.action_input = input.map(String::from);
        step
    }

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(
            normalize_content("  The Pod,  is\tCRASH-looping!  "),
            "the pod is crash looping"
        );
    }

    #[test]
    fn test_identical_content_is_duplicate() {
        let mut seen = SeenSteps::new(DedupOptions::default());
        assert!(seen.admit(&step(StepKind::Thought, "check the pods")));
        assert!(!seen.admit(&step(StepKind::Thought, "Check the pods!")));
    }

    #[test]
    fn test_different_kinds_never_duplicate() {
        let mut seen = SeenSteps::new(DedupOptions::default());
        assert!(seen.admit(&step(StepKind::Thought, "check the pods")));
        assert!(seen.admit(&step(StepKind::Analysis, "check the pods")));
    }

    #[test]
    fn test_actions_duplicate_by_name_and_input() {
        let mut seen = SeenSteps::new(DedupOptions::default());
        assert!(seen.admit(&action_step(
            "list_pods",
            Some("namespace=default"),
            "list_pods namespace=default"
        )));
        // Same action identity wrapped in different surrounding content.
        assert!(!seen.admit(&action_step(
            "list_pods",
            Some("namespace=default"),
            "calling list_pods with namespace=default to enumerate workloads"
        )));
        // Different input is a different action.
        assert!(seen.admit(&action_step(
            "list_pods",
            Some("namespace=kube-system"),
            "list_pods namespace=kube-system"
        )));
    }

    #[test]
    fn test_short_content_requires_exact_match() {
        let mut seen = SeenSteps::new(DedupOptions::default());
        assert!(seen.admit(&step(StepKind::Thought, "check pods")));
        assert!(seen.admit(&step(StepKind::Thought, "check pods again")));
    }

    #[test]
    fn test_long_content_substring_containment() {
        let mut seen = SeenSteps::new(DedupOptions::default());
        let base = "the api deployment is failing its readiness probe on every rollout";
        assert!(seen.admit(&step(StepKind::Thought, base)));
        let extended = format!("{base} and the previous revision is still serving traffic");
        assert!(!seen.admit(&step(StepKind::Thought, &extended)));
    }

    #[test]
    fn test_long_content_word_overlap() {
        let mut seen = SeenSteps::new(DedupOptions::default());
        assert!(seen.admit(&step(
            StepKind::Thought,
            "the ingress controller dropped connections during the rolling restart"
        )));
        // Same significant vocabulary, different ordering and filler.
        assert!(!seen.admit(&step(
            StepKind::Thought,
            "during the rolling restart, the ingress controller dropped some connections"
        )));
    }

    #[test]
    fn test_long_distinct_content_admitted() {
        let mut seen = SeenSteps::new(DedupOptions::default());
        assert!(seen.admit(&step(
            StepKind::Thought,
            "the database connection pool is exhausted under sustained write load"
        )));
        assert!(seen.admit(&step(
            StepKind::Thought,
            "the cache hit ratio dropped sharply after the schema migration finished"
        )));
    }

    #[test]
    fn test_seen_state_is_per_instance() {
        let mut first = SeenSteps::new(DedupOptions::default());
        assert!(first.admit(&step(StepKind::Thought, "check the pods")));

        // A fresh accumulator (a new stage or a new build pass) has no memory.
        let mut second = SeenSteps::new(DedupOptions::default());
        assert!(second.admit(&step(StepKind::Thought, "check the pods")));
    }
}
