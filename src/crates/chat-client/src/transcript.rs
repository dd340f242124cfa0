use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use aura_chat_types::{ChatTurn, TurnId, TurnRole, TurnState};
use chrono::Local;
use log::debug;
use tokio::sync::broadcast;

/// Transcript mutations, fanned out to whatever is rendering the chat.
///
/// Renderers are decoupled through a broadcast channel: a slow or absent
/// renderer never blocks a mutation, it just lags.
#[derive(Debug, Clone)]
pub enum TranscriptEvent {
    TurnStarted { id: TurnId, role: TurnRole },
    Appended { id: TurnId, fragment: String },
    Finalized { id: TurnId },
    Reset,
}

/// Ordered sequence of chat turns with monotonic id assignment.
///
/// Constructed explicitly at surface start and passed by handle; there is no
/// global instance. All mutation of a given turn arrives from the single
/// pump task of its stream session, the lock only guards cross-task reads.
pub struct TranscriptStore {
    turns: RwLock<Vec<ChatTurn>>,
    next_id: AtomicU64,
    events: broadcast::Sender<TranscriptEvent>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            turns: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.events.subscribe()
    }

    /// Record a submitted user message. User turns are immutable from birth.
    pub fn push_user(&self, content: &str) -> TurnId {
        let id = self.allocate_id();
        let turn = ChatTurn {
            id,
            role: TurnRole::User,
            content: content.to_string(),
            timestamp: now_label(),
            state: TurnState::Finalized,
        };
        self.turns.write().expect("transcript lock poisoned").push(turn);
        self.emit(TranscriptEvent::TurnStarted {
            id,
            role: TurnRole::User,
        });
        id
    }

    /// Open the agent turn a stream session will populate.
    pub fn begin_agent_turn(&self) -> TurnId {
        let id = self.allocate_id();
        let turn = ChatTurn {
            id,
            role: TurnRole::Agent,
            content: String::new(),
            timestamp: now_label(),
            state: TurnState::Empty,
        };
        self.turns.write().expect("transcript lock poisoned").push(turn);
        self.emit(TranscriptEvent::TurnStarted {
            id,
            role: TurnRole::Agent,
        });
        id
    }

    /// Append a fragment to a turn. Suffix concatenation only.
    ///
    /// Returns whether the fragment was applied. Fragments for finalized or
    /// unknown turns are dropped, not applied.
    pub fn append(&self, id: TurnId, fragment: &str) -> bool {
        {
            let mut turns = self.turns.write().expect("transcript lock poisoned");
            let Some(turn) = turns.iter_mut().find(|turn| turn.id == id) else {
                debug!("dropping fragment for unknown turn {}", id);
                return false;
            };
            if turn.is_finalized() {
                debug!("dropping late fragment for finalized turn {}", id);
                return false;
            }
            turn.content.push_str(fragment);
            turn.state = TurnState::Streaming;
        }
        self.emit(TranscriptEvent::Appended {
            id,
            fragment: fragment.to_string(),
        });
        true
    }

    /// Make a turn immutable. Idempotent.
    pub fn finalize(&self, id: TurnId) {
        {
            let mut turns = self.turns.write().expect("transcript lock poisoned");
            let Some(turn) = turns.iter_mut().find(|turn| turn.id == id) else {
                return;
            };
            if turn.is_finalized() {
                return;
            }
            turn.state = TurnState::Finalized;
        }
        self.emit(TranscriptEvent::Finalized { id });
    }

    pub fn state(&self, id: TurnId) -> Option<TurnState> {
        self.turns
            .read()
            .expect("transcript lock poisoned")
            .iter()
            .find(|turn| turn.id == id)
            .map(|turn| turn.state)
    }

    pub fn content(&self, id: TurnId) -> Option<String> {
        self.turns
            .read()
            .expect("transcript lock poisoned")
            .iter()
            .find(|turn| turn.id == id)
            .map(|turn| turn.content.clone())
    }

    pub fn snapshot(&self) -> Vec<ChatTurn> {
        self.turns.read().expect("transcript lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.turns.read().expect("transcript lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every turn. Ids keep counting up, they are never reused.
    pub fn reset(&self) {
        self.turns.write().expect("transcript lock poisoned").clear();
        self.emit(TranscriptEvent::Reset);
    }

    fn allocate_id(&self) -> TurnId {
        TurnId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn emit(&self, event: TranscriptEvent) {
        // No renderer attached is fine.
        let _ = self.events.send(event);
    }
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now_label() -> String {
    Local::now().format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_concatenate_in_order() {
        let store = TranscriptStore::new();
        let id = store.begin_agent_turn();
        for fragment in ["He", "ll", "o"] {
            assert!(store.append(id, fragment));
        }
        assert_eq!(store.content(id).as_deref(), Some("Hello"));
        assert_eq!(store.state(id), Some(TurnState::Streaming));
    }

    #[test]
    fn finalized_turn_drops_fragments() {
        let store = TranscriptStore::new();
        let id = store.begin_agent_turn();
        store.append(id, "partial");
        store.finalize(id);
        assert!(!store.append(id, " late"));
        assert_eq!(store.content(id).as_deref(), Some("partial"));
        assert_eq!(store.state(id), Some(TurnState::Finalized));
    }

    #[test]
    fn finalize_is_idempotent() {
        let store = TranscriptStore::new();
        let id = store.begin_agent_turn();
        store.finalize(id);
        store.finalize(id);
        assert_eq!(store.state(id), Some(TurnState::Finalized));
    }

    #[test]
    fn user_turns_are_immutable_from_birth() {
        let store = TranscriptStore::new();
        let id = store.push_user("hi");
        assert!(!store.append(id, " more"));
        assert_eq!(store.content(id).as_deref(), Some("hi"));
    }

    #[test]
    fn ids_are_monotonic_across_reset() {
        let store = TranscriptStore::new();
        let first = store.push_user("one");
        store.reset();
        assert!(store.is_empty());
        let second = store.push_user("two");
        assert!(second > first);
    }

    #[test]
    fn mutations_fan_out_to_subscribers() {
        let store = TranscriptStore::new();
        let mut events = store.subscribe();
        let id = store.begin_agent_turn();
        store.append(id, "tok");
        store.finalize(id);

        assert!(matches!(
            events.try_recv(),
            Ok(TranscriptEvent::TurnStarted { role: TurnRole::Agent, .. })
        ));
        match events.try_recv() {
            Ok(TranscriptEvent::Appended { fragment, .. }) => assert_eq!(fragment, "tok"),
            other => panic!("expected Appended, got {:?}", other),
        }
        assert!(matches!(events.try_recv(), Ok(TranscriptEvent::Finalized { .. })));
    }
}
