//! Model context assembly from a caller-owned conversation.
//!
//! Nothing is kept between calls: each turn's context is rebuilt from the
//! history the panel hands in.

use scholar_core::{ConversationHistory, MediaAttachment, ModelTurn, PromptPart};

/// Appended to the system instruction when the user supplies notes.
pub const NOTES_CONTRACT: &str = "The user has provided their own study notes, marked [My Notes]. \
Answer the question marked [My Question] using those notes as your primary source. \
If the notes do not contain the answer, say so explicitly and then answer from general knowledge.";

/// Everything the gateway needs for one chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInput {
    pub system_instruction: String,
    pub prior: Vec<ModelTurn>,
    pub message: Vec<PromptPart>,
}

/// Builds [`SessionInput`] values for a fixed base system instruction.
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    system_instruction: String,
}

impl SessionBuilder {
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
        }
    }

    /// Assemble the context for `question`.
    ///
    /// `history` must not yet contain the new user turn. The in-progress turn,
    /// failed responses and turns with empty content are left out; attachments
    /// of earlier turns are not re-sent.
    pub fn build(
        &self,
        history: &ConversationHistory,
        question: &str,
        notes: Option<&str>,
        attachment: Option<&MediaAttachment>,
    ) -> SessionInput {
        let prior: Vec<ModelTurn> = history
            .finalized_turns()
            .filter(|t| !t.failed && !t.content.trim().is_empty())
            .map(|t| ModelTurn {
                role: t.role,
                parts: vec![PromptPart::text(t.content.clone())],
            })
            .collect();

        let notes = notes.filter(|n| !n.trim().is_empty());
        let (system_instruction, text) = match notes {
            Some(notes) => (
                format!("{}\n\n{}", self.system_instruction, NOTES_CONTRACT),
                format_with_notes(notes, question),
            ),
            None => (self.system_instruction.clone(), question.to_string()),
        };

        let mut message = vec![PromptPart::text(text)];
        if let Some(attachment) = attachment {
            message.push(attachment.to_part());
        }

        tracing::debug!(
            prior_turns = prior.len(),
            with_notes = notes.is_some(),
            with_attachment = attachment.is_some(),
            "Session input built"
        );

        SessionInput {
            system_instruction,
            prior,
            message,
        }
    }
}

/// The message text sent when notes accompany a question.
pub fn format_with_notes(notes: &str, question: &str) -> String {
    format!("[My Notes]\n{}\n\n[My Question]\n{}", notes, question)
}

// =============================================================================
// Tests
// =============================================================================
