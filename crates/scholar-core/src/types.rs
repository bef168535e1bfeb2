use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ScholarError};

// =============================================================================
// Type aliases
// =============================================================================

/// Stable identifier of a conversation turn, used for UI diffing.
pub type TurnId = Uuid;

/// UTC timestamp.
pub type Timestamp = DateTime<Utc>;

// =============================================================================
// Enums
// =============================================================================

/// Author of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One segment of a prompt sent to the model.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptPart {
    /// Plain text.
    Text(String),
    /// Raw bytes of an image, PDF, etc. sent inline with the request.
    InlineMedia { bytes: Vec<u8>, media_type: String },
}

impl PromptPart {
    pub fn text(text: impl Into<String>) -> Self {
        PromptPart::Text(text.into())
    }

    /// Returns the text of a `Text` part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PromptPart::Text(t) => Some(t),
            PromptPart::InlineMedia { .. } => None,
        }
    }
}

impl std::fmt::Debug for PromptPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptPart::Text(t) => f.debug_tuple("Text").field(t).finish(),
            PromptPart::InlineMedia { bytes, media_type } => f
                .debug_struct("InlineMedia")
                .field("media_type", media_type)
                .field("bytes_len", &bytes.len())
                .finish(),
        }
    }
}

/// Returns `true` when every text part is blank and there is no media.
pub fn prompt_is_empty(parts: &[PromptPart]) -> bool {
    parts.iter().all(|p| match p {
        PromptPart::Text(t) => t.trim().is_empty(),
        PromptPart::InlineMedia { bytes, .. } => bytes.is_empty(),
    })
}

// =============================================================================
// Conversation data
// =============================================================================

/// Name and media type of a file the user attached to a turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedFile {
    pub name: String,
    pub media_type: String,
}

/// A file the user is attaching to the next message, bytes included.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaAttachment {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl MediaAttachment {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// The descriptor recorded on the user turn.
    pub fn descriptor(&self) -> AttachedFile {
        AttachedFile {
            name: self.name.clone(),
            media_type: self.media_type.clone(),
        }
    }

    /// The inline media part sent to the model.
    pub fn to_part(&self) -> PromptPart {
        PromptPart::InlineMedia {
            bytes: self.bytes.clone(),
            media_type: self.media_type.clone(),
        }
    }
}

impl std::fmt::Debug for MediaAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaAttachment")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

/// One message in a conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub id: TurnId,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_file: Option<AttachedFile>,
    pub created_at: Timestamp,
    /// The response ended in a client-side error marker or notice rather than
    /// model output. Such turns are shown but never sent back as context.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
}

impl ConversationTurn {
    fn new(role: Role, content: String, attached_file: Option<AttachedFile>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            attached_file,
            created_at: Utc::now(),
            failed: false,
        }
    }
}

/// A prior turn in the shape the model gateway folds into remote context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTurn {
    pub role: Role,
    pub parts: Vec<PromptPart>,
}

/// Ordered, caller-owned conversation.
///
/// Insertion order is chronological order. At most one assistant turn is
/// in progress at a time, and while one is, it is the last element.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
    #[serde(skip)]
    in_progress: Option<TurnId>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn get(&self, id: TurnId) -> Option<&ConversationTurn> {
        self.turns.iter().find(|t| t.id == id)
    }

    /// Whether an assistant response is currently being written.
    pub fn is_in_progress(&self) -> bool {
        self.in_progress.is_some()
    }

    pub fn in_progress_id(&self) -> Option<TurnId> {
        self.in_progress
    }

    pub fn in_progress(&self) -> Option<&ConversationTurn> {
        self.in_progress.and_then(|id| self.get(id))
    }

    /// Turns that are no longer being written, in chronological order.
    pub fn finalized_turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        let open = self.in_progress;
        self.turns.iter().filter(move |t| Some(t.id) != open)
    }

    /// Append a user turn. Rejected while a response is in flight.
    pub fn push_user(
        &mut self,
        content: impl Into<String>,
        attached_file: Option<AttachedFile>,
    ) -> Result<TurnId> {
        self.ensure_idle()?;
        let turn = ConversationTurn::new(Role::User, content.into(), attached_file);
        let id = turn.id;
        self.turns.push(turn);
        Ok(id)
    }

    /// Append an empty assistant turn and mark it in progress.
    pub fn open_response(&mut self) -> Result<TurnId> {
        self.ensure_idle()?;
        let turn = ConversationTurn::new(Role::Assistant, String::new(), None);
        let id = turn.id;
        self.turns.push(turn);
        self.in_progress = Some(id);
        tracing::debug!(turn_id = %id, "Response turn opened");
        Ok(id)
    }

    /// Replace the content of the in-progress turn wholesale.
    pub fn write_in_progress(&mut self, content: String) -> Result<()> {
        let id = self
            .in_progress
            .ok_or_else(|| ScholarError::Input("no response is in progress".to_string()))?;
        let turn = self
            .turns
            .iter_mut()
            .rev()
            .find(|t| t.id == id)
            .ok_or_else(|| ScholarError::Input(format!("in-progress turn {} is missing", id)))?;
        turn.content = content;
        Ok(())
    }

    /// Mark the in-progress turn as final. Returns its id, if one was open.
    pub fn finalize(&mut self) -> Option<TurnId> {
        let id = self.in_progress.take();
        if let Some(id) = id {
            tracing::debug!(turn_id = %id, "Response turn finalized");
        }
        id
    }

    /// Flag the in-progress turn as failed, then finalize it.
    pub fn finalize_failed(&mut self) -> Option<TurnId> {
        let id = self.in_progress?;
        if let Some(turn) = self.turns.iter_mut().rev().find(|t| t.id == id) {
            turn.failed = true;
        }
        self.finalize()
    }

    /// Clear the whole session.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.in_progress = None;
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.in_progress {
            Some(id) => Err(ScholarError::Input(format!(
                "response {} is still in progress",
                id
            ))),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Speech
// =============================================================================

/// Identity of a UI element that can own an utterance.
pub type OwnerId = Uuid;

/// Snapshot of one speech controller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechSession {
    pub listening: bool,
    pub speaking: bool,
    pub active_utterance_owner: Option<OwnerId>,
}

// =============================================================================
// Tests
// =============================================================================
