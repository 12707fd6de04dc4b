//! Dialogue state for the two-actor search.
//!
//! - [`SessionState`]: where one conversation is in the dialogue.
//! - [`SessionStore`]: the process-wide map of conversations, guarded by a
//!   single reader/writer lock.
//! - [`CorrelationTracker`]: stable log-correlation ids stored on the session.

pub mod correlation;
pub mod state;
pub mod store;

pub use correlation::CorrelationTracker;
pub use state::{SessionState, Step};
pub use store::SessionStore;
