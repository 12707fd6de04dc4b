use crate::store::SessionStore;
use costar_core::ConversationId;
use std::sync::Arc;
use uuid::Uuid;

/// Hands out the correlation id of a conversation, generating it on first use.
///
/// The id lives on the session, so it is stable until the session is reset.
#[derive(Clone)]
pub struct CorrelationTracker {
    sessions: Arc<SessionStore>,
}

impl CorrelationTracker {
    /// Track ids on the given store.
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }

    /// The conversation's correlation id, generated and stored on first use.
    pub fn correlation_id(&self, id: ConversationId) -> String {
        self.sessions.update(id, |state| {
            state
                .correlation_id
                .get_or_insert_with(new_correlation_id)
                .clone()
        })
    }

    /// The stored correlation id, or a fresh one that is not stored.
    ///
    /// Reading never creates a session, so conversations that never start a
    /// search leave nothing behind. A fresh id sticks once a cycle adopts it.
    pub fn current(&self, id: ConversationId) -> String {
        self.sessions
            .peek(id)
            .and_then(|state| state.correlation_id)
            .unwrap_or_else(new_correlation_id)
    }

    /// A span carrying the conversation and correlation ids, entered for
    /// the whole handling of one event.
    pub fn span(&self, id: ConversationId, correlation_id: &str) -> tracing::Span {
        tracing::info_span!("conversation", conversation_id = id, correlation_id = %correlation_id)
    }
}

fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}
