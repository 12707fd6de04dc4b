//! Prometheus text exposition of a [`MetricsSnapshot`].

use costar_core::{MetricsSnapshot, LATENCY_BUCKETS_SECS};
use std::fmt::Write;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render `snapshot` in the Prometheus text format.
pub fn render(snapshot: &MetricsSnapshot) -> String {
    let mut out = String::new();

    header(&mut out, "bot_commands_total", "counter", "Commands handled, by command and status.");
    for (command, statuses) in &snapshot.commands {
        for (status, count) in statuses {
            let _ = writeln!(
                out,
                "bot_commands_total{{command=\"{}\",status=\"{}\"}} {count}",
                escape(command),
                status.as_str()
            );
        }
    }

    header(
        &mut out,
        "bot_command_duration_seconds",
        "histogram",
        "Time spent handling a command.",
    );
    for (command, stats) in &snapshot.command_latency {
        let command = escape(command);
        for (bound, count) in LATENCY_BUCKETS_SECS.iter().zip(stats.buckets) {
            let _ = writeln!(
                out,
                "bot_command_duration_seconds_bucket{{command=\"{command}\",le=\"{bound}\"}} {count}"
            );
        }
        let _ = writeln!(
            out,
            "bot_command_duration_seconds_bucket{{command=\"{command}\",le=\"+Inf\"}} {}",
            stats.count
        );
        let _ = writeln!(
            out,
            "bot_command_duration_seconds_sum{{command=\"{command}\"}} {}",
            stats.total_ms as f64 / 1000.0
        );
        let _ = writeln!(
            out,
            "bot_command_duration_seconds_count{{command=\"{command}\"}} {}",
            stats.count
        );
    }

    header(
        &mut out,
        "bot_active_users_total",
        "gauge",
        "Conversations currently inside a search cycle.",
    );
    let _ = writeln!(out, "bot_active_users_total {}", snapshot.active_sessions);

    header(
        &mut out,
        "bot_api_failures_total",
        "counter",
        "Catalog responses with a non-success status, by status code.",
    );
    for (status, count) in &snapshot.upstream {
        if !(200..300).contains(status) {
            let _ = writeln!(out, "bot_api_failures_total{{method=\"{status}\"}} {count}");
        }
    }

    header(
        &mut out,
        "bot_messages_sent_total",
        "counter",
        "Gateway calls that succeeded, by type.",
    );
    for (kind, counts) in &snapshot.messages {
        let _ = writeln!(
            out,
            "bot_messages_sent_total{{type=\"{}\"}} {}",
            kind.as_str(),
            counts.delivered
        );
    }

    header(
        &mut out,
        "bot_messages_failed_total",
        "counter",
        "Gateway calls that failed or timed out, by type.",
    );
    for (kind, counts) in &snapshot.messages {
        let _ = writeln!(
            out,
            "bot_messages_failed_total{{type=\"{}\"}} {}",
            kind.as_str(),
            counts.failed
        );
    }

    header(
        &mut out,
        "bot_cache_operations_total",
        "counter",
        "Movie cache outcomes.",
    );
    for (event, count) in &snapshot.cache {
        let _ = writeln!(
            out,
            "bot_cache_operations_total{{result=\"{}\"}} {count}",
            event.as_str()
        );
    }

    out
}

fn header(out: &mut String, name: &str, kind: &str, help: &str) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} {kind}");
}

fn escape(label: &str) -> String {
    label
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use costar_core::{CacheEvent, CommandStatus, InMemoryMetrics, MessageKind, Metrics};
    use std::time::Duration;

    fn lines(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    #[test]
    fn test_empty_registry_renders_headers_and_gauge() {
        let text = render(&InMemoryMetrics::new().snapshot());
        let lines = lines(&text);
        assert!(lines.contains(&"# TYPE bot_commands_total counter"));
        assert!(lines.contains(&"# TYPE bot_command_duration_seconds histogram"));
        assert!(lines.contains(&"bot_active_users_total 0"));
        assert!(!text.contains("bot_commands_total{"));
    }

    #[test]
    fn test_counters_carry_labels() {
        let metrics = InMemoryMetrics::new();
        metrics.command_processed("start", CommandStatus::Success);
        metrics.command_processed("start", CommandStatus::Error);
        metrics.message_sent(MessageKind::CallbackAnswer, true);
        metrics.message_sent(MessageKind::Photo, false);
        metrics.cache_event(CacheEvent::Hit);
        metrics.session_opened();

        let text = render(&metrics.snapshot());
        let lines = lines(&text);
        assert!(lines.contains(&"bot_commands_total{command=\"start\",status=\"success\"} 1"));
        assert!(lines.contains(&"bot_commands_total{command=\"start\",status=\"error\"} 1"));
        assert!(lines.contains(&"bot_messages_sent_total{type=\"callback_answer\"} 1"));
        assert!(lines.contains(&"bot_messages_failed_total{type=\"photo\"} 1"));
        assert!(lines.contains(&"bot_cache_operations_total{result=\"hit\"} 1"));
        assert!(lines.contains(&"bot_active_users_total 1"));
    }

    #[test]
    fn test_only_non_success_statuses_are_api_failures() {
        let metrics = InMemoryMetrics::new();
        metrics.upstream_response(200);
        metrics.upstream_response(401);
        metrics.upstream_response(503);
        metrics.upstream_response(503);

        let text = render(&metrics.snapshot());
        let lines = lines(&text);
        assert!(lines.contains(&"bot_api_failures_total{method=\"401\"} 1"));
        assert!(lines.contains(&"bot_api_failures_total{method=\"503\"} 2"));
        assert!(!text.contains("method=\"200\""));
    }

    #[test]
    fn test_latency_histogram() {
        let metrics = InMemoryMetrics::new();
        metrics.command_latency("start", Duration::from_millis(250));
        metrics.command_latency("start", Duration::from_millis(3000));

        let text = render(&metrics.snapshot());
        let lines = lines(&text);
        assert!(lines.contains(&"bot_command_duration_seconds_bucket{command=\"start\",le=\"0.1\"} 0"));
        assert!(lines.contains(&"bot_command_duration_seconds_bucket{command=\"start\",le=\"0.5\"} 1"));
        assert!(lines.contains(&"bot_command_duration_seconds_bucket{command=\"start\",le=\"2\"} 1"));
        assert!(lines.contains(&"bot_command_duration_seconds_bucket{command=\"start\",le=\"5\"} 2"));
        assert!(lines.contains(&"bot_command_duration_seconds_bucket{command=\"start\",le=\"+Inf\"} 2"));
        assert!(lines.contains(&"bot_command_duration_seconds_sum{command=\"start\"} 3.25"));
        assert!(lines.contains(&"bot_command_duration_seconds_count{command=\"start\"} 2"));
    }

    #[test]
    fn test_label_values_are_escaped() {
        assert_eq!(escape("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }
}
