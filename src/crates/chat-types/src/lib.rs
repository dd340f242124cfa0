// Aura shared chat DTOs - wire shapes and the transcript turn model

pub mod turn;
pub mod wire;

pub use turn::{ChatTurn, TurnId, TurnRole, TurnState};
pub use wire::{ChatRequest, ControlEnvelope, EnvelopeKind, HealthStatus};
