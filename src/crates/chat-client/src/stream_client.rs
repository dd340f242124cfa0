use aura_chat_types::{ChatRequest, HealthStatus};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use log::{debug, error, trace};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::error::StreamError;

/// Event tag the gateway uses to signal graceful end of a response.
const CLOSE_EVENT: &str = "close";

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Agent gateway base URL, e.g. `http://localhost:8080/api/ai`.
    pub base_url: String,
    pub idle_timeout: Duration,
}

impl StreamConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// One notification from the stream task, in arrival order.
///
/// `Closed` and `Failed` are terminal: the task has exited and nothing
/// further will be sent. A cancelled stream sends neither.
#[derive(Debug)]
pub enum StreamEvent {
    /// Raw data of one SSE event. Plain text token or a control envelope;
    /// telling the two apart is the assembler's job, not this layer's.
    Payload(String),
    Closed,
    Failed(StreamError),
}

/// Receiving end of one stream. Dropping it does not stop the underlying
/// request; cancel the token passed to [`ChatStreamClient::start_stream`].
pub struct StreamHandle {
    pub events: mpsc::UnboundedReceiver<StreamEvent>,
}

/// HTTP/SSE client for the agent gateway.
#[derive(Clone)]
pub struct ChatStreamClient {
    http: reqwest::Client,
    config: StreamConfig,
}

impl ChatStreamClient {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Open the chat stream for one request.
    ///
    /// Spawns the stream task and returns immediately. Cancelling `cancel`
    /// at any point drops the connection and ends the task silently: no
    /// `Closed`, no `Failed`. Cancelling twice is fine.
    pub fn start_stream(&self, request: ChatRequest, cancel: CancellationToken) -> StreamHandle {
        let (tx_event, rx_event) = mpsc::unbounded_channel();
        let http = self.http.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("chat stream cancelled by caller");
                }
                _ = run_stream(http, config, request, tx_event) => {}
            }
        });

        StreamHandle { events: rx_event }
    }

    /// Gateway health probe.
    pub async fn health(&self) -> Result<HealthStatus, StreamError> {
        let response = self
            .http
            .get(format!("{}/health", self.config.base_url))
            .send()
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))?;

        if let Some(err) = StreamError::from_status(response.status()) {
            return Err(err);
        }

        response
            .json()
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))
    }
}

/// Issue the request and pump SSE events into `tx_event`.
///
/// Sends exactly one terminal notification (`Closed` or `Failed`) and
/// returns. Runs inside the cancellation select of `start_stream`, so it can
/// be dropped at any await point without sending anything further.
async fn run_stream(
    http: reqwest::Client,
    config: StreamConfig,
    request: ChatRequest,
    tx_event: mpsc::UnboundedSender<StreamEvent>,
) {
    let response = match http
        .post(format!("{}/chat", config.base_url))
        .json(&request)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            error!("chat stream connect failed: {}", e);
            let _ = tx_event.send(StreamEvent::Failed(StreamError::Transport(e.to_string())));
            return;
        }
    };

    if let Some(err) = StreamError::from_status(response.status()) {
        error!("chat stream refused: {}", err);
        let _ = tx_event.send(StreamEvent::Failed(err));
        return;
    }

    let mut stream = response.bytes_stream().eventsource();

    loop {
        let sse_event = timeout(config.idle_timeout, stream.next()).await;
        let sse = match sse_event {
            Ok(Some(Ok(sse))) => sse,
            Ok(None) => {
                // Gateway hung up without a close event; still a graceful end.
                debug!("chat stream ended without a close event");
                let _ = tx_event.send(StreamEvent::Closed);
                return;
            }
            Ok(Some(Err(e))) => {
                error!("SSE stream error: {}", e);
                let _ = tx_event.send(StreamEvent::Failed(StreamError::Transport(e.to_string())));
                return;
            }
            Err(_) => {
                error!(
                    "SSE timeout: no event within {}s",
                    config.idle_timeout.as_secs()
                );
                let _ = tx_event.send(StreamEvent::Failed(StreamError::IdleTimeout(
                    config.idle_timeout,
                )));
                return;
            }
        };

        trace!("chat SSE [{}]: {}", sse.event, sse.data);

        if sse.event == CLOSE_EVENT {
            let _ = tx_event.send(StreamEvent::Closed);
            return;
        }

        let _ = tx_event.send(StreamEvent::Payload(sse.data));
    }
}
