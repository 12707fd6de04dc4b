use crate::courier::Courier;
use crate::matching::{common_movie_ids, select_candidates};
use crate::replies;
use chrono::Utc;
use costar_catalog::MovieLookup;
use costar_channels::{ActionLink, InboundEvent, MessagingGateway};
use costar_core::{
    ActorId, CandidateCard, CommandStatus, ConversationId, CostarError, CostarResult, MessageId,
    Metrics, MovieId, MovieRecord,
};
use costar_session::{CorrelationTracker, SessionState, SessionStore, Step};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::Instrument;

/// Tunables of the conversation engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Deadline for every gateway call.
    pub send_timeout: Duration,
    /// Above this many common movies only the count is reported.
    pub max_rendered_movies: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(5),
            max_rendered_movies: 10,
        }
    }
}

/// The dialogue state machine.
///
/// One call to [`handle`](Self::handle) per inbound event. Events of
/// different conversations may be handled concurrently; the session store is
/// the only shared state and is never locked across a network call. Steps
/// are committed with a check on the step the handler started from, so a
/// replayed or racing event cannot advance a conversation twice.
pub struct ConversationEngine {
    sessions: Arc<SessionStore>,
    correlation: CorrelationTracker,
    lookup: Arc<dyn MovieLookup>,
    courier: Courier,
    metrics: Arc<dyn Metrics>,
    settings: EngineSettings,
}

impl ConversationEngine {
    /// Wire an engine. The gateway is reached only through a [`Courier`].
    pub fn new(
        sessions: Arc<SessionStore>,
        lookup: Arc<dyn MovieLookup>,
        gateway: Arc<dyn MessagingGateway>,
        metrics: Arc<dyn Metrics>,
        settings: EngineSettings,
    ) -> Self {
        let correlation = CorrelationTracker::new(sessions.clone());
        let courier = Courier::new(gateway, metrics.clone(), settings.send_timeout);
        Self {
            sessions,
            correlation,
            lookup,
            courier,
            metrics,
            settings,
        }
    }

    /// Process one inbound event inside the conversation's log span.
    pub async fn handle(&self, event: InboundEvent) {
        let conversation = event.conversation();
        let correlation_id = self.correlation.current(conversation);
        let span = self.correlation.span(conversation, &correlation_id);
        self.dispatch(event, correlation_id).instrument(span).await;
    }

    async fn dispatch(&self, event: InboundEvent, correlation_id: String) {
        tracing::debug!(kind = event.kind(), "Event received");
        match event {
            InboundEvent::Command {
                conversation,
                command,
                args,
            } => {
                self.on_command(conversation, &command, &args, correlation_id)
                    .await;
            }
            InboundEvent::Text { conversation, text } => self.on_text(conversation, &text).await,
            InboundEvent::Callback {
                conversation,
                callback_id,
                message_id,
                data,
            } => {
                self.on_callback(conversation, &callback_id, message_id, &data)
                    .await;
            }
            InboundEvent::Disconnected { conversation } => self.on_disconnected(conversation),
        }
    }

    /// Tell every conversation in a search cycle that the bot is going away.
    ///
    /// Notices go out concurrently; whatever is not delivered within `grace`
    /// is abandoned. Returns the number of notices delivered.
    pub async fn broadcast_shutdown(&self, grace: Duration) -> usize {
        let targets: Vec<ConversationId> = self
            .sessions
            .list_active_ids()
            .into_iter()
            .filter(|id| self.sessions.peek(*id).is_some_and(|s| s.is_active()))
            .collect();
        tracing::info!(conversations = targets.len(), "Broadcasting shutdown notice");

        let mut sends = JoinSet::new();
        for conversation in targets {
            let courier = self.courier.clone();
            sends.spawn(async move {
                courier
                    .text(conversation, replies::SHUTDOWN_NOTICE)
                    .await
                    .is_ok()
            });
        }

        let mut delivered = 0;
        let drained = tokio::time::timeout(grace, async {
            while let Some(sent) = sends.join_next().await {
                if matches!(sent, Ok(true)) {
                    delivered += 1;
                }
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!(pending = sends.len(), "Shutdown notices abandoned");
            sends.abort_all();
        }
        delivered
    }

    // ── Commands ─────────────────────────────────────────────────────────

    async fn on_command(
        &self,
        conversation: ConversationId,
        command: &str,
        args: &str,
        correlation_id: String,
    ) {
        let started = Instant::now();
        tracing::info!(command, args, "Command received");

        let (label, delivered) = match command {
            "start" => (
                "start",
                self.start_cycle(conversation, correlation_id).await,
            ),
            "help" => ("help", self.say(conversation, replies::HELP).await),
            _ => (
                "unknown",
                self.say(conversation, replies::UNKNOWN_COMMAND).await,
            ),
        };

        let status = if delivered {
            CommandStatus::Success
        } else {
            CommandStatus::Error
        };
        self.metrics.command_processed(label, status);
        self.metrics.command_latency(label, started.elapsed());
    }

    /// Only `/start` creates a session entry; the id logged for the event
    /// becomes the id of the new cycle.
    async fn start_cycle(&self, conversation: ConversationId, correlation_id: String) -> bool {
        let (was_active, stale_media) = self.sessions.update(conversation, |state| {
            let was_active = state.is_active();
            let stale_media = state.take_outstanding_media();
            let correlation_id = state.correlation_id.take().unwrap_or(correlation_id);
            *state = SessionState::started(Some(correlation_id));
            (was_active, stale_media)
        });
        if was_active {
            tracing::info!("Search restarted");
        } else {
            self.metrics.session_opened();
        }
        self.clear_media(conversation, &stale_media).await;
        self.say(conversation, replies::ASK_FIRST_ACTOR).await
    }

    // ── Actor search ─────────────────────────────────────────────────────

    async fn on_text(&self, conversation: ConversationId, text: &str) {
        let step = self
            .sessions
            .peek(conversation)
            .map_or(Step::Idle, |state| state.step);
        let Some(selecting) = step.next().filter(|_| step.accepts_name()) else {
            tracing::debug!(step = %step, "Free text outside a name prompt");
            self.say(conversation, replies::SEND_START).await;
            return;
        };
        if text.is_empty() {
            self.say(conversation, replies::ENTER_NAME).await;
            return;
        }

        let actors = match self.lookup.search_actors(text).await {
            Ok(actors) => actors,
            Err(e) => return self.fail_cycle(conversation, step, &e).await,
        };
        let cards = select_candidates(text, &actors);
        tracing::info!(
            query = text,
            found = actors.len(),
            presented = cards.len(),
            "Actor search finished"
        );
        if cards.is_empty() {
            self.say(conversation, replies::NO_ACTORS_FOUND).await;
            return;
        }

        let committed = self
            .sessions
            .update_existing(conversation, |state| {
                if state.step != step || state.advance(selecting).is_err() {
                    return false;
                }
                state.replace_candidates(cards.clone());
                true
            })
            .unwrap_or(false);
        if !committed {
            tracing::debug!("Step moved during the search, results dropped");
            return;
        }
        self.present_candidates(conversation, selecting, &cards)
            .await;
    }

    async fn present_candidates(
        &self,
        conversation: ConversationId,
        selecting: Step,
        cards: &[CandidateCard],
    ) {
        self.say(conversation, replies::CANDIDATES_FOUND).await;
        for card in cards {
            let actions = [
                ActionLink::url(replies::PROFILE_LABEL, &card.profile_url),
                ActionLink::callback(replies::SELECT_LABEL, card.actor_id.to_string()),
            ];
            let Ok(message_id) = self
                .courier
                .photo(conversation, &card.photo_url, &card.caption, &actions)
                .await
            else {
                continue;
            };
            let tracked = self
                .sessions
                .update_existing(conversation, |state| {
                    if state.step != selecting {
                        return false;
                    }
                    state.outstanding_media.push(message_id);
                    true
                })
                .unwrap_or(false);
            if !tracked {
                // The user picked or restarted while photos were going out.
                let _ = self.courier.delete(conversation, message_id).await;
            }
        }
    }

    // ── Selection ────────────────────────────────────────────────────────

    async fn on_callback(
        &self,
        conversation: ConversationId,
        callback_id: &str,
        message_id: MessageId,
        data: &str,
    ) {
        let Ok(actor_id) = data.parse::<ActorId>() else {
            tracing::warn!(data, "Callback with malformed data");
            let _ = self
                .courier
                .answer(callback_id, replies::INVALID_SELECTION)
                .await;
            return;
        };

        let snapshot = self.sessions.peek(conversation).unwrap_or_default();
        let expected = snapshot.step;
        let Some(card) = snapshot
            .candidate(actor_id)
            .cloned()
            .filter(|_| expected.accepts_selection())
        else {
            tracing::info!(actor_id, step = %expected, "Stale or repeated selection");
            let _ = self
                .courier
                .answer(callback_id, replies::SELECTION_EXPIRED)
                .await;
            return;
        };

        let mut next = snapshot;
        let media = next.take_outstanding_media();
        let duplicate = match next.record_selection(actor_id) {
            Ok(()) => false,
            Err(CostarError::InvalidInput(reason)) => {
                tracing::info!(actor_id, reason = %reason, "Same actor selected twice");
                // Completing the cycle is what claims it against replays.
                if let Err(e) = next.advance(Step::Completed) {
                    return self.fail_cycle(conversation, expected, &e).await;
                }
                true
            }
            Err(e) => return self.fail_cycle(conversation, expected, &e).await,
        };
        if !self
            .sessions
            .compare_and_set(conversation, expected, next.clone())
        {
            let _ = self
                .courier
                .answer(callback_id, replies::SELECTION_EXPIRED)
                .await;
            return;
        }
        tracing::info!(actor_id, step = %next.step, "Actor selected");

        let deleted = self.clear_media(conversation, &media).await;
        let notice = if duplicate {
            replies::DUPLICATE_NOTICE
        } else {
            ""
        };
        let _ = self.courier.answer(callback_id, notice).await;
        if !deleted.contains(&message_id) {
            let profile_only = [ActionLink::url(replies::PROFILE_LABEL, &card.profile_url)];
            let _ = self
                .courier
                .edit(conversation, message_id, &profile_only)
                .await;
        }

        if duplicate {
            self.close_cycle(conversation, Step::Completed, "duplicate_actor");
            self.say(conversation, replies::DUPLICATE_ACTOR).await;
            return;
        }
        match next.actor_pair() {
            Some((first, second)) => {
                self.render_common_movies(conversation, first, second)
                    .await;
            }
            None => {
                self.say(conversation, replies::ASK_SECOND_ACTOR).await;
            }
        }
    }

    // ── Common movies ────────────────────────────────────────────────────

    async fn render_common_movies(
        &self,
        conversation: ConversationId,
        first: ActorId,
        second: ActorId,
    ) {
        let ids = match self.common_ids(first, second).await {
            Ok(ids) => ids,
            Err(e) => return self.fail_cycle(conversation, Step::Completed, &e).await,
        };
        tracing::info!(first, second, common = ids.len(), "Filmographies intersected");

        match ids.len() {
            0 => {
                self.say(conversation, replies::NO_COMMON_MOVIES).await;
            }
            n if n > self.settings.max_rendered_movies => {
                self.say(conversation, &replies::too_many_movies(n)).await;
            }
            _ => {
                let mut movies = Vec::with_capacity(ids.len());
                for id in ids {
                    match self.lookup.movie_by_id(id).await {
                        Ok(movie) => movies.push(movie),
                        Err(e) => {
                            return self.fail_cycle(conversation, Step::Completed, &e).await
                        }
                    }
                }
                self.say(conversation, replies::COMMON_MOVIES).await;
                for movie in &movies {
                    self.render_movie(conversation, movie).await;
                }
            }
        }
        self.close_cycle(conversation, Step::Completed, "completed");
    }

    async fn common_ids(&self, first: ActorId, second: ActorId) -> CostarResult<Vec<MovieId>> {
        let (first_movies, second_movies) = tokio::try_join!(
            self.lookup.movies_by_actor(first),
            self.lookup.movies_by_actor(second)
        )?;
        Ok(common_movie_ids(&first_movies, &second_movies))
    }

    async fn render_movie(&self, conversation: ConversationId, movie: &MovieRecord) {
        let caption = movie.caption();
        if movie.poster_url.is_empty() {
            self.say(conversation, &format!("{caption}\n{}", movie.link))
                .await;
            return;
        }
        let actions = [ActionLink::url(replies::PROFILE_LABEL, &movie.link)];
        let _ = self
            .courier
            .photo(conversation, &movie.poster_url, &caption, &actions)
            .await;
    }

    // ── Cycle bookkeeping ────────────────────────────────────────────────

    fn on_disconnected(&self, conversation: ConversationId) {
        tracing::info!("Conversation disconnected");
        if let Some(state) = self.sessions.reset(conversation) {
            self.record_closed(&state, "disconnected");
        }
    }

    async fn fail_cycle(&self, conversation: ConversationId, expected: Step, error: &CostarError) {
        tracing::error!(step = %expected, error = %error, "Search cycle failed");
        if let Some(state) = self.close_cycle(conversation, expected, "failed") {
            self.clear_media(conversation, &state.outstanding_media)
                .await;
        }
        self.say(conversation, replies::GENERIC_FAILURE).await;
    }

    /// Reset the session if it is still at `expected`.
    fn close_cycle(
        &self,
        conversation: ConversationId,
        expected: Step,
        reason: &'static str,
    ) -> Option<SessionState> {
        let removed = self.sessions.reset_if(conversation, expected)?;
        self.record_closed(&removed, reason);
        Some(removed)
    }

    fn record_closed(&self, state: &SessionState, reason: &'static str) {
        if !state.is_active() {
            return;
        }
        self.metrics.session_closed();
        let duration_ms = state
            .started_at
            .map(|started| (Utc::now() - started).num_milliseconds());
        tracing::info!(reason, step = %state.step, duration_ms, "Search cycle closed");
    }

    /// Delete each message, returning the ones that are gone.
    async fn clear_media(&self, conversation: ConversationId, media: &[MessageId]) -> Vec<MessageId> {
        let mut deleted = Vec::with_capacity(media.len());
        for &message_id in media {
            if self.courier.delete(conversation, message_id).await.is_ok() {
                deleted.push(message_id);
            }
        }
        deleted
    }

    async fn say(&self, conversation: ConversationId, text: &str) -> bool {
        self.courier.text(conversation, text).await.is_ok()
    }
}
