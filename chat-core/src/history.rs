use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Word-count budget applied to the full prompt.
pub const TOKEN_BUDGET: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

impl fmt::Display for ConversationTurn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.speaker {
            Speaker::User => write!(f, "User: {}", self.text),
            Speaker::Assistant => write!(f, "Assistant: {}", self.text),
        }
    }
}

/// Named token estimation strategy, so the word-count heuristic can be
/// swapped for a real tokenizer without touching the eviction contract.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

/// Approximates token count by whitespace-delimited word count.
pub struct WordCountEstimator;

impl TokenEstimator for WordCountEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Ordered conversation history with FIFO eviction against a token budget.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextWindow {
    turns: VecDeque<ConversationTurn>,
}

impl ContextWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    fn render(&self, preamble: &str) -> String {
        let mut lines = Vec::with_capacity(self.turns.len() + 2);
        lines.push(preamble.to_string());
        lines.extend(self.turns.iter().map(|turn| turn.to_string()));
        lines.push("Assistant:".to_string());
        lines.join("\n")
    }

    /// Build the full prompt: preamble, every turn in order, then a trailing
    /// assistant cue, newline-separated.
    ///
    /// If the estimate exceeds `budget`, the oldest turn is evicted and the
    /// prompt rebuilt, repeatedly, until it fits or the window is empty.
    /// Eviction is destructive. When the preamble alone is over budget the
    /// prompt is returned over budget with an emptied window; no further
    /// truncation is attempted.
    pub fn build_prompt(
        &mut self,
        preamble: &str,
        estimator: &dyn TokenEstimator,
        budget: usize,
    ) -> String {
        let mut prompt = self.render(preamble);
        while estimator.estimate(&prompt) > budget && !self.turns.is_empty() {
            let evicted = self.turns.pop_front();
            debug!(
                evicted = ?evicted.map(|t| t.speaker),
                remaining = self.turns.len(),
                "evicted oldest turn to satisfy token budget"
            );
            prompt = self.render(preamble);
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_layout_is_preamble_turns_cue() {
        let mut window = ContextWindow::new();
        window.append(ConversationTurn::user("hello"));
        window.append(ConversationTurn::assistant("hi there"));

        let prompt = window.build_prompt("Preamble", &WordCountEstimator, TOKEN_BUDGET);
        assert_eq!(prompt, "Preamble\nUser: hello\nAssistant: hi there\nAssistant:");
    }

    #[test]
    fn eviction_drops_oldest_until_budget_fits() {
        let mut window = ContextWindow::new();
        for i in 0..10 {
            window.append(ConversationTurn::user(format!("message number {i}")));
        }

        // Each turn renders as 4 words; preamble 1 word, cue 1 word.
        let prompt = window.build_prompt("intro", &WordCountEstimator, 14);
        assert!(WordCountEstimator.estimate(&prompt) <= 14);
        // Oldest turns were discarded, newest kept.
        assert!(prompt.contains("message number 9"));
        assert!(!prompt.contains("message number 0"));
    }

    #[test]
    fn eviction_invariant_holds_after_any_append_sequence() {
        let mut window = ContextWindow::new();
        let budget = 30;
        for i in 0..50 {
            window.append(ConversationTurn::user(format!("turn {i} with some words")));
            let prompt = window.build_prompt("preamble words here", &WordCountEstimator, budget);
            assert!(
                WordCountEstimator.estimate(&prompt) <= budget || window.is_empty(),
                "budget violated with non-empty window"
            );
        }
    }

    #[test]
    fn oversized_preamble_empties_window_but_still_returns_prompt() {
        let mut window = ContextWindow::new();
        window.append(ConversationTurn::user("hi"));

        let preamble = "word ".repeat(100);
        let prompt = window.build_prompt(&preamble, &WordCountEstimator, 10);
        assert!(window.is_empty());
        // Known boundary condition: budget may still be exceeded.
        assert!(WordCountEstimator.estimate(&prompt) > 10);
    }
}
