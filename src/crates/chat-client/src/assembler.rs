use std::sync::Arc;

use aura_chat_types::{ControlEnvelope, EnvelopeKind, TurnId};
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::error::StreamError;
use crate::stream_client::StreamEvent;
use crate::transcript::TranscriptStore;

/// Fixed marker appended to a turn that ended on an error. Always a suffix:
/// whatever partial text already streamed in stays visible above it.
pub const STREAM_ERROR_MARKER: &str =
    "\n⚠ The assistant ran into a problem while answering. Please try again.";

/// Turns one stream's raw payloads into transcript mutations and a single
/// terminal signal.
///
/// Bound to exactly one agent turn; holds the session's cancellation token
/// so a terminal envelope can stop the stream client from emitting further
/// events. Work per payload is bounded and synchronous.
pub struct MessageAssembler {
    transcript: Arc<TranscriptStore>,
    turn_id: TurnId,
    cancel: CancellationToken,
    finalized: bool,
}

impl MessageAssembler {
    pub fn new(transcript: Arc<TranscriptStore>, turn_id: TurnId, cancel: CancellationToken) -> Self {
        Self {
            transcript,
            turn_id,
            cancel,
            finalized: false,
        }
    }

    pub fn turn_id(&self) -> TurnId {
        self.turn_id
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Dispatch one stream notification.
    pub fn on_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Payload(data) => self.on_payload(&data),
            StreamEvent::Closed => self.on_closed(),
            StreamEvent::Failed(err) => self.on_error(&err),
        }
    }

    /// Handle one raw payload: control envelope or literal text.
    ///
    /// A payload qualifies as an envelope only if, trimmed, it starts with
    /// `{` and ends with `}` and decodes as an object. Everything else,
    /// malformed JSON included, is appended verbatim; mixed plain-text and
    /// structured events are the wire format working as intended.
    pub fn on_payload(&mut self, payload: &str) {
        if self.finalized {
            debug!("dropping payload for finalized turn {}", self.turn_id);
            return;
        }
        match sniff_envelope(payload) {
            Some(envelope) => self.apply_envelope(payload, envelope),
            None => {
                self.append(payload);
            }
        }
    }

    /// Graceful end of stream. Idempotent.
    pub fn on_closed(&mut self) {
        if self.finalized {
            return;
        }
        self.finalize();
    }

    /// Stream-level failure. The turn keeps its partial text and gains the
    /// error marker; a turn already finalized is left untouched.
    pub fn on_error(&mut self, err: &StreamError) {
        if self.finalized {
            debug!("dropping late error for finalized turn {}: {}", self.turn_id, err);
            return;
        }
        warn!("chat stream failed for turn {}: {}", self.turn_id, err);
        self.append(STREAM_ERROR_MARKER);
        self.finalize();
    }

    fn apply_envelope(&mut self, raw: &str, envelope: ControlEnvelope) {
        if let Some(intent) = envelope.intent.as_deref() {
            debug!("agent routed turn {} as {}", self.turn_id, intent);
        }
        if let Some(content) = envelope.content.as_deref() {
            self.append(content);
        }
        match envelope.kind {
            Some(EnvelopeKind::Complete) => self.finalize(),
            Some(EnvelopeKind::Error) => {
                self.append(STREAM_ERROR_MARKER);
                self.finalize();
            }
            Some(EnvelopeKind::Unknown) | None => {
                // Parsed but not recognized and carrying no content: keep the
                // payload visible rather than dropping it on the floor.
                if envelope.content.is_none() {
                    self.append(raw);
                }
            }
        }
    }

    fn append(&mut self, fragment: &str) {
        self.transcript.append(self.turn_id, fragment);
    }

    /// Absorbing. Also cancels the stream session so the client stops
    /// emitting; cancelling an already-ended stream is a no-op.
    fn finalize(&mut self) {
        self.finalized = true;
        self.transcript.finalize(self.turn_id);
        self.cancel.cancel();
    }
}

fn sniff_envelope(payload: &str) -> Option<ControlEnvelope> {
    let trimmed = payload.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}
