// Aura Chat Client - streaming core for the onboarding assistant
// Layering: transcript -> assembler -> stream client -> session

pub mod assembler;
pub mod error;
pub mod session;
pub mod stream_client;
pub mod transcript;

pub use assembler::{MessageAssembler, STREAM_ERROR_MARKER};
pub use error::{ChatError, StreamError};
pub use session::{ChatSession, StreamSession};
pub use stream_client::{ChatStreamClient, StreamConfig, StreamEvent, StreamHandle};
pub use transcript::{TranscriptEvent, TranscriptStore};

// Re-export the DTO layer so apps depend on one crate.
pub use aura_chat_types as types;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
