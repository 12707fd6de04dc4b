//! Conversation engine for the costar bot.
//!
//! Consumes [`InboundEvent`](costar_channels::InboundEvent)s, drives the
//! per-conversation [`Step`](costar_session::Step) machine and renders the
//! outcome through a [`MessagingGateway`](costar_channels::MessagingGateway).
//!
//! # Main types
//!
//! - [`ConversationEngine`]: Handles one inbound event at a time per task.
//! - [`Courier`]: Deadline-bounded, metered gateway calls.
//! - [`EngineSettings`]: Tunables for rendering and delivery.

/// Deadline-bounded gateway calls.
pub mod courier;
/// The state machine.
pub mod engine;
/// Candidate disambiguation and filmography intersection.
pub mod matching;
/// User-facing texts.
#[allow(missing_docs)]
pub mod replies;

pub use courier::Courier;
pub use engine::{ConversationEngine, EngineSettings};
pub use matching::{common_movie_ids, normalize_name, select_candidates};
