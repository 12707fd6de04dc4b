use chrono::{DateTime, Utc};
use costar_core::{ActorId, CandidateCard, CostarError, CostarResult, MessageId};
use serde::{Deserialize, Serialize};

/// Position of a conversation in the dialogue. Only ever moves forward, one
/// step at a time, or back to [`Step::Idle`] through a reset.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// No search in progress.
    #[default]
    Idle,
    /// Waiting for the first actor's name.
    AwaitingFirstActor,
    /// Candidates for the first actor are on screen.
    SelectingFirstActor,
    /// Waiting for the second actor's name.
    AwaitingSecondActor,
    /// Candidates for the second actor are on screen.
    SelectingSecondActor,
    /// Both actors chosen; common movies are being produced.
    Completed,
}

impl Step {
    /// The only step this one may advance to.
    pub fn next(self) -> Option<Step> {
        match self {
            Step::Idle => Some(Step::AwaitingFirstActor),
            Step::AwaitingFirstActor => Some(Step::SelectingFirstActor),
            Step::SelectingFirstActor => Some(Step::AwaitingSecondActor),
            Step::AwaitingSecondActor => Some(Step::SelectingSecondActor),
            Step::SelectingSecondActor => Some(Step::Completed),
            Step::Completed => None,
        }
    }

    /// Free text is read as an actor name in these steps.
    pub fn accepts_name(self) -> bool {
        matches!(self, Step::AwaitingFirstActor | Step::AwaitingSecondActor)
    }

    /// Selection callbacks are honoured in these steps.
    pub fn accepts_selection(self) -> bool {
        matches!(self, Step::SelectingFirstActor | Step::SelectingSecondActor)
    }

    /// Stable label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Idle => "idle",
            Step::AwaitingFirstActor => "awaiting_first_actor",
            Step::SelectingFirstActor => "selecting_first_actor",
            Step::AwaitingSecondActor => "awaiting_second_actor",
            Step::SelectingSecondActor => "selecting_second_actor",
            Step::Completed => "completed",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dialogue state of one conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Log-correlation id, assigned lazily by the correlation tracker.
    pub correlation_id: Option<String>,
    /// Current step.
    pub step: Step,
    /// Set once the first candidate is picked.
    pub first_actor_id: Option<ActorId>,
    /// Set once the second candidate is picked.
    pub second_actor_id: Option<ActorId>,
    /// Result of the latest search, in presentation order.
    pub pending_candidates: Vec<CandidateCard>,
    /// Candidate photos still on screen.
    pub outstanding_media: Vec<MessageId>,
    /// When the current cycle was opened with `/start`.
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// A fresh, idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// A new cycle waiting for the first actor, keeping the correlation id.
    pub fn started(correlation_id: Option<String>) -> Self {
        Self {
            correlation_id,
            step: Step::AwaitingFirstActor,
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Whether a search cycle is in progress.
    pub fn is_active(&self) -> bool {
        self.step != Step::Idle
    }

    /// Move to `next`, which must be the immediate successor of the current step.
    pub fn advance(&mut self, next: Step) -> CostarResult<()> {
        if self.step.next() != Some(next) {
            return Err(CostarError::Session(format!(
                "cannot move from {} to {}",
                self.step, next
            )));
        }
        self.step = next;
        Ok(())
    }

    /// Replace the candidates of the previous search.
    pub fn replace_candidates(&mut self, cards: Vec<CandidateCard>) {
        self.pending_candidates = cards;
    }

    /// Look up a candidate from the latest search.
    pub fn candidate(&self, actor_id: ActorId) -> Option<&CandidateCard> {
        self.pending_candidates
            .iter()
            .find(|c| c.actor_id == actor_id)
    }

    /// Record a picked candidate and advance past the selecting step.
    ///
    /// Picking the first actor again in the second slot is refused; the
    /// caller ends the cycle in that case.
    pub fn record_selection(&mut self, actor_id: ActorId) -> CostarResult<()> {
        match self.step {
            Step::SelectingFirstActor => {
                self.advance(Step::AwaitingSecondActor)?;
                self.first_actor_id = Some(actor_id);
            }
            Step::SelectingSecondActor => {
                if self.first_actor_id == Some(actor_id) {
                    return Err(CostarError::InvalidInput(format!(
                        "actor {actor_id} selected twice"
                    )));
                }
                self.advance(Step::Completed)?;
                self.second_actor_id = Some(actor_id);
            }
            other => {
                return Err(CostarError::Session(format!(
                    "no selection expected in step {other}"
                )));
            }
        }
        self.pending_candidates.clear();
        Ok(())
    }

    /// Hand over the ids of candidate photos still on screen.
    pub fn take_outstanding_media(&mut self) -> Vec<MessageId> {
        std::mem::take(&mut self.outstanding_media)
    }

    /// Both actors, once the second selection went through.
    pub fn actor_pair(&self) -> Option<(ActorId, ActorId)> {
        Some((self.first_actor_id?, self.second_actor_id?))
    }
}
