use serde::{Deserialize, Serialize};

/// Body of `POST /chat` on the agent gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub thread_id: String,
    /// Code the agent should review or verify, for code-review turns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_code: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, thread_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            thread_id: thread_id.into(),
            user_code: None,
        }
    }

    pub fn with_user_code(mut self, code: impl Into<String>) -> Self {
        self.user_code = Some(code.into());
        self
    }
}

/// `GET /health` response from the agent gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub llm_mode: String,
    pub llm_provider: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeKind {
    Complete,
    Error,
    #[serde(other)]
    Unknown,
}

/// Structured payload mixed into the token stream.
///
/// The wire format deliberately interleaves plain-text tokens with single
/// JSON objects of this shape; anything that fails to decode is rendered as
/// literal text by the consumer, never surfaced as an error.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlEnvelope {
    #[serde(rename = "type")]
    pub kind: Option<EnvelopeKind>,
    /// Visible text fragment to append in place of the raw payload.
    pub content: Option<String>,
    /// Routing decision the agent took for this turn. Diagnostic only.
    pub intent: Option<String>,
}

impl ControlEnvelope {
    /// Terminal envelopes end the turn.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            Some(EnvelopeKind::Complete) | Some(EnvelopeKind::Error)
        )
    }
}
