use crate::state::{SessionState, Step};
use costar_core::ConversationId;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// In-memory map of conversation id to dialogue state.
///
/// Every operation goes through one reader/writer lock over the whole map.
/// Critical sections never span an `.await`, so the store is safe to call
/// from async tasks without yielding.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<ConversationId, SessionState>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the conversation's state, creating an idle one on first access.
    pub fn get(&self, id: ConversationId) -> SessionState {
        if let Some(state) = self.sessions.read().get(&id) {
            return state.clone();
        }
        // Re-checked under the write lock: another task may have inserted
        // between the two acquisitions.
        self.sessions.write().entry(id).or_default().clone()
    }

    /// Replace the stored state.
    pub fn set(&self, id: ConversationId, state: SessionState) {
        self.sessions.write().insert(id, state);
    }

    /// Drop the conversation's state, returning what was stored.
    pub fn reset(&self, id: ConversationId) -> Option<SessionState> {
        let removed = self.sessions.write().remove(&id);
        if removed.is_some() {
            tracing::debug!(conversation_id = id, "Session reset");
        }
        removed
    }

    /// Drop the conversation's state only if its step still equals `expected`.
    pub fn reset_if(&self, id: ConversationId, expected: Step) -> Option<SessionState> {
        let mut sessions = self.sessions.write();
        if sessions.get(&id)?.step != expected {
            return None;
        }
        let removed = sessions.remove(&id);
        tracing::debug!(conversation_id = id, step = %expected, "Session reset");
        removed
    }

    /// Snapshot of the conversation's state without creating one.
    pub fn peek(&self, id: ConversationId) -> Option<SessionState> {
        self.sessions.read().get(&id).cloned()
    }

    /// Every conversation currently known to the store.
    pub fn list_active_ids(&self) -> HashSet<ConversationId> {
        self.sessions.read().keys().copied().collect()
    }

    /// Mutate the state in place (creating it if absent) under the write lock.
    pub fn update<R>(&self, id: ConversationId, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut sessions = self.sessions.write();
        f(sessions.entry(id).or_default())
    }

    /// Mutate an existing state under the write lock. `None` if absent.
    pub fn update_existing<R>(
        &self,
        id: ConversationId,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> Option<R> {
        self.sessions.write().get_mut(&id).map(f)
    }

    /// Store `state` only if the stored step still equals `expected`.
    ///
    /// A missing entry counts as [`Step::Idle`]. Returns whether the state
    /// was written.
    pub fn compare_and_set(&self, id: ConversationId, expected: Step, state: SessionState) -> bool {
        let mut sessions = self.sessions.write();
        let current = sessions.get(&id).map_or(Step::Idle, |s| s.step);
        if current != expected {
            tracing::debug!(
                conversation_id = id,
                expected = %expected,
                current = %current,
                "Stale session write discarded"
            );
            return false;
        }
        sessions.insert(id, state);
        true
    }

    /// Number of conversations in the store.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether the store holds no conversations.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
