use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aura_chat_types::{ChatRequest, TurnId};
use log::debug;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::assembler::MessageAssembler;
use crate::error::ChatError;
use crate::stream_client::{ChatStreamClient, StreamEvent};
use crate::transcript::TranscriptStore;

/// Handle to the one in-flight agent response of a chat surface.
pub struct StreamSession {
    cancel: CancellationToken,
    turn_id: TurnId,
    live: Arc<AtomicBool>,
}

impl StreamSession {
    pub fn turn_id(&self) -> TurnId {
        self.turn_id
    }

    /// Whether the pump task is still running. Flips to false exactly once.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// One chat surface: a transcript, a conversation thread id, and at most one
/// live stream session.
///
/// Sends are single-flight: while a response is streaming, further sends are
/// rejected rather than queued, and the running stream is never implicitly
/// cancelled. Stopping it is an explicit affordance.
pub struct ChatSession {
    client: ChatStreamClient,
    transcript: Arc<TranscriptStore>,
    thread_id: String,
    active: Option<StreamSession>,
}

impl ChatSession {
    pub fn new(client: ChatStreamClient, transcript: Arc<TranscriptStore>) -> Self {
        Self {
            client,
            transcript,
            thread_id: Uuid::new_v4().to_string(),
            active: None,
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn transcript(&self) -> &Arc<TranscriptStore> {
        &self.transcript
    }

    pub fn is_streaming(&self) -> bool {
        self.active.as_ref().is_some_and(StreamSession::is_live)
    }

    /// Turn currently being populated, if a stream session is live.
    pub fn active_turn(&self) -> Option<TurnId> {
        self.active
            .as_ref()
            .filter(|session| session.is_live())
            .map(StreamSession::turn_id)
    }

    /// Submit one user message and start streaming the agent's answer.
    ///
    /// Returns the id of the agent turn being populated. Must be called from
    /// within a tokio runtime.
    pub fn send(&mut self, message: &str) -> Result<TurnId, ChatError> {
        let request = ChatRequest::new(message, &self.thread_id);
        self.send_request(message, request)
    }

    /// Like [`send`](Self::send), with code attached for a review turn.
    pub fn send_with_code(&mut self, message: &str, code: &str) -> Result<TurnId, ChatError> {
        let request = ChatRequest::new(message, &self.thread_id).with_user_code(code);
        self.send_request(message, request)
    }

    fn send_request(&mut self, message: &str, request: ChatRequest) -> Result<TurnId, ChatError> {
        if self.is_streaming() {
            return Err(ChatError::StreamInFlight);
        }

        self.transcript.push_user(message);
        let turn_id = self.transcript.begin_agent_turn();

        let cancel = CancellationToken::new();
        let live = Arc::new(AtomicBool::new(true));

        let mut handle = self.client.start_stream(request, cancel.clone());
        let mut assembler = MessageAssembler::new(self.transcript.clone(), turn_id, cancel.clone());

        // One pump per stream: all mutation of this turn happens here,
        // strictly in arrival order. The receive is gated on the session
        // token so nothing already buffered is observable after a cancel.
        let pump_cancel = cancel.clone();
        let pump_live = live.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = pump_cancel.cancelled() => break,
                    event = handle.events.recv() => {
                        let Some(event) = event else { break };
                        assembler.on_event(event);
                        if assembler.is_finalized() {
                            break;
                        }
                    }
                }
            }
            pump_live.store(false, Ordering::SeqCst);
        });

        self.active = Some(StreamSession {
            cancel,
            turn_id,
            live,
        });
        Ok(turn_id)
    }

    /// Explicit stop affordance. Silent at the stream layer — no error
    /// marker; the partial text stays and the turn is finalized as-is.
    /// Idempotent.
    pub fn stop(&mut self) {
        if let Some(session) = self.active.as_ref() {
            debug!("stopping stream for turn {}", session.turn_id());
            session.cancel();
            self.transcript.finalize(session.turn_id());
        }
    }

    /// Full transcript reset. Stops any in-flight stream first.
    pub fn reset(&mut self) {
        self.stop();
        self.active = None;
        self.transcript.reset();
    }
}
