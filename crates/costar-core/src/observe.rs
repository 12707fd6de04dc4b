use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Outcome of a cache read or backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheEvent {
    /// Served from the fast store.
    Hit,
    /// Not in the fast store, origin consulted.
    Miss,
    /// Fast store failed on read; treated as a miss.
    Error,
    /// Backfill into the fast store failed.
    WriteError,
}

impl CacheEvent {
    /// Label value, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Error => "error",
            Self::WriteError => "write_error",
        }
    }
}

/// Kind of outbound gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text message.
    Text,
    /// Photo with caption and actions.
    Photo,
    /// Message deletion.
    Delete,
    /// Callback acknowledgement.
    CallbackAnswer,
    /// Action (keyboard) edit.
    Edit,
}

impl MessageKind {
    /// Label value, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Photo => "photo",
            Self::Delete => "delete",
            Self::CallbackAnswer => "callback_answer",
            Self::Edit => "edit",
        }
    }
}

/// Whether a command was handled cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    /// Handled and replied to.
    Success,
    /// Handling or replying failed.
    Error,
}

impl CommandStatus {
    /// Label value, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Fire-and-forget observer. Implementations must never affect control flow.
pub trait Metrics: Send + Sync {
    /// A command finished with the given status.
    fn command_processed(&self, command: &str, status: CommandStatus);
    /// Time spent handling a command.
    fn command_latency(&self, command: &str, elapsed: Duration);
    /// A conversation entered an active search cycle.
    fn session_opened(&self);
    /// An active search cycle ended (completed, failed or abandoned).
    fn session_closed(&self);
    /// A cache read or backfill outcome.
    fn cache_event(&self, event: CacheEvent);
    /// An outbound gateway call finished.
    fn message_sent(&self, kind: MessageKind, delivered: bool);
    /// The catalog answered with the given HTTP status.
    fn upstream_response(&self, status: u16);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn command_processed(&self, _command: &str, _status: CommandStatus) {}
    fn command_latency(&self, _command: &str, _elapsed: Duration) {}
    fn session_opened(&self) {}
    fn session_closed(&self) {}
    fn cache_event(&self, _event: CacheEvent) {}
    fn message_sent(&self, _kind: MessageKind, _delivered: bool) {}
    fn upstream_response(&self, _status: u16) {}
}

/// Upper bounds, in seconds, of the command latency histogram buckets.
pub const LATENCY_BUCKETS_SECS: [f64; 5] = [0.1, 0.5, 1.0, 2.0, 5.0];

/// Latency aggregate for one command.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencyStats {
    /// Number of observations.
    pub count: u64,
    /// Sum of all observations in milliseconds.
    pub total_ms: u64,
    /// Slowest observation in milliseconds.
    pub max_ms: u64,
    /// Cumulative counts: `buckets[i]` observations took at most
    /// `LATENCY_BUCKETS_SECS[i]`.
    pub buckets: [u64; LATENCY_BUCKETS_SECS.len()],
}

impl LatencyStats {
    fn observe(&mut self, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.count += 1;
        self.total_ms = self.total_ms.saturating_add(ms);
        self.max_ms = self.max_ms.max(ms);
        let secs = elapsed.as_secs_f64();
        for (bucket, bound) in self.buckets.iter_mut().zip(LATENCY_BUCKETS_SECS) {
            if secs <= bound {
                *bucket += 1;
            }
        }
    }
}

#[derive(Default)]
struct Counters {
    commands: BTreeMap<(String, CommandStatus), u64>,
    latency: BTreeMap<String, LatencyStats>,
    cache: BTreeMap<CacheEvent, u64>,
    messages: BTreeMap<(MessageKind, bool), u64>,
    upstream: BTreeMap<u16, u64>,
}

/// In-process metrics registry, exported by the status endpoint.
#[derive(Default)]
pub struct InMemoryMetrics {
    active_sessions: AtomicI64,
    counters: Mutex<Counters>,
}

/// Delivered and failed counts for one kind of gateway call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryCounts {
    /// Calls that succeeded.
    pub delivered: u64,
    /// Calls that failed or timed out.
    pub failed: u64,
}

/// Point-in-time copy of [`InMemoryMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Conversations currently inside a search cycle.
    pub active_sessions: i64,
    /// `command -> status -> count`.
    pub commands: BTreeMap<String, BTreeMap<CommandStatus, u64>>,
    /// `command -> latency`.
    pub command_latency: BTreeMap<String, LatencyStats>,
    /// Cache outcome counts.
    pub cache: BTreeMap<CacheEvent, u64>,
    /// Outbound gateway calls per kind.
    pub messages: BTreeMap<MessageKind, DeliveryCounts>,
    /// Upstream status code counts.
    pub upstream: BTreeMap<u16, u64>,
}

impl InMemoryMetrics {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy out the current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.counters.lock();
        let mut commands: BTreeMap<String, BTreeMap<CommandStatus, u64>> = BTreeMap::new();
        for ((command, status), count) in &counters.commands {
            commands
                .entry(command.clone())
                .or_default()
                .insert(*status, *count);
        }
        let mut messages: BTreeMap<MessageKind, DeliveryCounts> = BTreeMap::new();
        for ((kind, delivered), count) in &counters.messages {
            let entry = messages.entry(*kind).or_default();
            if *delivered {
                entry.delivered = *count;
            } else {
                entry.failed = *count;
            }
        }
        MetricsSnapshot {
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            commands,
            command_latency: counters.latency.clone(),
            cache: counters.cache.clone(),
            messages,
            upstream: counters.upstream.clone(),
        }
    }
}

impl Metrics for InMemoryMetrics {
    fn command_processed(&self, command: &str, status: CommandStatus) {
        *self
            .counters
            .lock()
            .commands
            .entry((command.to_string(), status))
            .or_insert(0) += 1;
    }

    fn command_latency(&self, command: &str, elapsed: Duration) {
        self.counters
            .lock()
            .latency
            .entry(command.to_string())
            .or_default()
            .observe(elapsed);
    }

    fn session_opened(&self) {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    fn session_closed(&self) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }

    fn cache_event(&self, event: CacheEvent) {
        *self.counters.lock().cache.entry(event).or_insert(0) += 1;
    }

    fn message_sent(&self, kind: MessageKind, delivered: bool) {
        *self
            .counters
            .lock()
            .messages
            .entry((kind, delivered))
            .or_insert(0) += 1;
    }

    fn upstream_response(&self, status: u16) {
        *self.counters.lock().upstream.entry(status).or_insert(0) += 1;
    }
}
