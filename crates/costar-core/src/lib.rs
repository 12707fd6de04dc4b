//! Core records and error definitions for the costar bot.
//!
//! This crate provides the types shared across all costar crates: the
//! catalog records the conversation works with, the unified error type and
//! the metrics observer seam.
//!
//! # Main types
//!
//! - [`CostarError`]: Unified error enum for all costar subsystems.
//! - [`CostarResult`]: Convenience alias for `Result<T, CostarError>`.
//! - [`ActorRecord`]: An actor as returned by a catalog search.
//! - [`MovieRecord`]: A fully denormalized movie, the unit of caching.
//! - [`CandidateCard`]: What the user is shown when picking an actor.
//! - [`Metrics`]: Fire-and-forget observer for counters and gauges.

/// Error type and result alias.
pub mod error;
/// Metrics observers.
pub mod observe;

pub use error::{CostarError, CostarResult};
pub use observe::{
    CacheEvent, CommandStatus, DeliveryCounts, InMemoryMetrics, LatencyStats, MessageKind,
    Metrics, MetricsSnapshot, NoopMetrics, LATENCY_BUCKETS_SECS,
};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier of one chat.
pub type ConversationId = i64;
/// Opaque handle of a message delivered by the gateway.
pub type MessageId = i64;
/// Catalog identifier of a person.
pub type ActorId = u64;
/// Catalog identifier of a movie.
pub type MovieId = u64;

// --- Catalog records ---

/// An actor as returned by a catalog search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRecord {
    /// Catalog identifier.
    pub id: ActorId,
    /// Name in the catalog's native language.
    pub name: String,
    /// Transliterated (English) name, possibly empty.
    #[serde(default)]
    pub en_name: String,
    /// Portrait URL, possibly empty.
    #[serde(default)]
    pub photo_url: String,
    /// Public profile page.
    pub profile_url: String,
    /// Date of birth when the catalog knows it.
    #[serde(default)]
    pub birthday: Option<DateTime<Utc>>,
}

impl ActorRecord {
    /// Human readable caption, e.g. `Кира Найтли (Keira Knightley), 1985`.
    pub fn caption(&self) -> String {
        let mut caption = if self.name.is_empty() {
            self.en_name.clone()
        } else {
            self.name.clone()
        };
        if !self.en_name.is_empty() && self.en_name != caption {
            caption.push_str(&format!(" ({})", self.en_name));
        }
        if let Some(birthday) = self.birthday {
            caption.push_str(&format!(", {}", birthday.year()));
        }
        caption
    }

    /// Lightweight display record kept on the session while the user picks.
    pub fn to_card(&self) -> CandidateCard {
        CandidateCard {
            actor_id: self.id,
            photo_url: self.photo_url.clone(),
            profile_url: self.profile_url.clone(),
            caption: self.caption(),
        }
    }
}

/// An actor presented to the user for disambiguation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCard {
    /// Catalog identifier, echoed back by the selection callback.
    pub actor_id: ActorId,
    /// Portrait URL.
    pub photo_url: String,
    /// Public profile page.
    pub profile_url: String,
    /// Caption rendered under the portrait.
    pub caption: String,
}

/// A movie record. Treated as immutable once published upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    /// Catalog identifier.
    pub id: MovieId,
    /// Title in the catalog's native language.
    pub name: String,
    /// Alternative (usually original or English) title.
    #[serde(default)]
    pub en_name: String,
    /// Poster URL, possibly empty.
    #[serde(default)]
    pub poster_url: String,
    /// Catalog rating.
    #[serde(default)]
    pub rating: f32,
    /// Release year.
    #[serde(default)]
    pub year: Option<i32>,
    /// Canonical page of the movie.
    pub link: String,
}

impl MovieRecord {
    /// Caption rendered under the poster.
    pub fn caption(&self) -> String {
        let mut caption = self.name.clone();
        if !self.en_name.is_empty() && self.en_name != self.name {
            caption.push_str(&format!(" ({})", self.en_name));
        }
        if let Some(year) = self.year {
            caption.push_str(&format!(" {year}"));
        }
        caption.push_str(&format!(", rating: {:.1}", self.rating));
        caption
    }
}
