//! Prompt assembly.
//!
//! The prompt is built in a fixed order: system instruction, retrieved
//! context, recent history, then the user question. Parts are joined with
//! a newline. Truncation limits count characters, not bytes or tokens.

use sage_core::config::PromptConfig;
use sage_core::text::truncate_chars;
use sage_core::types::{ChatTurn, RetrievalResult};

/// Instruction block that opens every prompt.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful AI assistant for an online learning platform (LMS).
Your role is to help users with questions about courses, learning, and the platform.
Be concise, helpful, and friendly. If you don't know something, say so honestly.
Use the provided context to answer questions when relevant.";

const CONTEXT_OPEN: &str = "\n\n--- Relevant Information ---";
const CONTEXT_CLOSE: &str = "\n--- End of Context ---\n";
const HISTORY_OPEN: &str = "\n--- Previous Conversation ---";
const HISTORY_CLOSE: &str = "\n--- End of History ---\n";
const CLOSING_INSTRUCTION: &str = "\nPlease provide a helpful response:";

/// Builds generation prompts within configured size limits.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    context_chars: usize,
    history_chars: usize,
    history_turns: usize,
}

impl PromptComposer {
    pub fn new(config: &PromptConfig) -> Self {
        Self {
            context_chars: config.context_chars,
            history_chars: config.history_chars,
            history_turns: config.history_turns,
        }
    }

    /// Compose the prompt for `query`.
    ///
    /// Context entries are numbered from 1 in the order given. Only the last
    /// `history_turns` turns are included, oldest first. Empty context or
    /// history omits the corresponding block entirely.
    pub fn build_prompt(
        &self,
        query: &str,
        context: &[RetrievalResult],
        history: &[ChatTurn],
    ) -> String {
        let mut parts: Vec<String> = vec![SYSTEM_INSTRUCTION.to_string()];

        if !context.is_empty() {
            parts.push(CONTEXT_OPEN.to_string());
            for (i, result) in context.iter().enumerate() {
                parts.push(format!("\n[{}] {}", i + 1, result.entry.title));
                parts.push(format!(
                    "   {}",
                    truncate_chars(&result.entry.content, self.context_chars)
                ));
            }
            parts.push(CONTEXT_CLOSE.to_string());
        }

        if !history.is_empty() {
            parts.push(HISTORY_OPEN.to_string());
            let start = history.len().saturating_sub(self.history_turns);
            for turn in &history[start..] {
                parts.push(format!(
                    "\n{}: {}",
                    turn.role.label(),
                    truncate_chars(&turn.content, self.history_chars)
                ));
            }
            parts.push(HISTORY_CLOSE.to_string());
        }

        parts.push(format!("\nUser Question: {}", query));
        parts.push(CLOSING_INSTRUCTION.to_string());

        parts.join("\n")
    }
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(&PromptConfig::default())
    }
}
