use serde::{Deserialize, Serialize};

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "message", rename_all = "snake_case")]
pub enum FinishReason {
    /// The model ended the sequence on its own.
    EndOfGeneration,
    StopSequence,
    MaxTokens,
    /// Cancellation was observed at a token boundary. Not an error.
    Cancelled,
    /// The runtime failed mid-run; carries the failure message.
    Failed(String),
}

impl FinishReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// One streamed update for a run.
///
/// Partial events carry the text accumulated so far. The single terminal
/// event has `is_complete == true`, carries the cleaned text and a
/// [`FinishReason`], and is always the last event of its run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub conversation_id: String,
    pub text: String,
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish: Option<FinishReason>,
}

impl StreamEvent {
    pub fn partial(conversation_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            text: text.into(),
            is_complete: false,
            finish: None,
        }
    }

    pub fn complete(
        conversation_id: impl Into<String>,
        text: impl Into<String>,
        finish: FinishReason,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            text: text.into(),
            is_complete: true,
            finish: Some(finish),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub conversation_id: String,
    /// Cleaned final text, identical to the terminal event's text.
    pub text: String,
    pub token_count: usize,
    pub finish: FinishReason,
}

impl GenerationOutcome {
    pub fn was_cancelled(&self) -> bool {
        self.finish == FinishReason::Cancelled
    }
}
