//! Builder input/output types and options.

use serde::{Deserialize, Serialize};

use crate::correlate::CorrelationOptions;
use crate::types::ConversationStep;

/// Lifecycle status of a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    #[default]
    Active,
    Completed,
    Failed,
}

/// Similarity thresholds for per-stage step deduplication.
///
/// The defaults are heuristic constants carried over from observed behavior;
/// they are policy, not structural, and callers may tune them.
#[derive(Debug, Clone, Copy)]
pub struct DedupOptions {
    /// Fraction of the shorter content that must overlap the longer for two
    /// steps to count as duplicates.
    pub overlap_threshold: f64,
    /// Normalized length below which only exact matches count.
    pub fuzzy_min_len: usize,
    /// Words at or below this length are ignored by the word-overlap test.
    pub min_word_len: usize,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.8,
            fuzzy_min_len: 30,
            min_word_len: 3,
        }
    }
}

/// Options for building a stage conversation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuilderOptions {
    pub correlation: CorrelationOptions,
    pub dedup: DedupOptions,
}

/// Summary counters for one build pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageMetadata {
    pub interaction_count: usize,
    pub step_count: usize,
    pub error_count: usize,
    /// Candidate steps suppressed as re-transmitted history.
    pub duplicate_count: usize,
}

/// Result of building one stage's conversation.
#[derive(Debug, Clone, Serialize)]
pub struct StageConversation {
    pub steps: Vec<ConversationStep>,
    pub metadata: StageMetadata,
}
