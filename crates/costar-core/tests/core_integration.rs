#![allow(clippy::unwrap_used, clippy::expect_used)]

use costar_core::*;

// ---------------------------------------------------------------------------
// 1. Error Display and From impls
// ---------------------------------------------------------------------------

#[test]
fn error_display_and_from_impls() {
    let err = CostarError::Catalog("connection refused".to_string());
    assert_eq!(err.to_string(), "Catalog error: connection refused");

    let err = CostarError::UpstreamStatus {
        status: 503,
        body: "maintenance".to_string(),
    };
    assert_eq!(err.to_string(), "Upstream returned status 503: maintenance");

    let err = CostarError::Timeout("sendPhoto".to_string());
    assert_eq!(err.to_string(), "Timed out: sendPhoto");

    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: CostarError = io.into();
    assert!(matches!(err, CostarError::Io(_)));

    let json_err = serde_json::from_str::<MovieRecord>("{").unwrap_err();
    let err: CostarError = json_err.into();
    assert!(err.to_string().starts_with("JSON error:"));
}

// ---------------------------------------------------------------------------
// 2. Movie records written by older versions still load
// ---------------------------------------------------------------------------

#[test]
fn movie_record_tolerates_missing_optional_fields() {
    let json = r#"{"id": 42, "name": "Брат", "link": "https://www.kinopoisk.ru/film/42/"}"#;
    let movie: MovieRecord = serde_json::from_str(json).unwrap();
    assert_eq!(movie.id, 42);
    assert!(movie.en_name.is_empty());
    assert!(movie.poster_url.is_empty());
    assert_eq!(movie.year, None);
    assert_eq!(movie.caption(), "Брат, rating: 0.0");
}

// ---------------------------------------------------------------------------
// 3. Metrics observers are interchangeable behind the trait
// ---------------------------------------------------------------------------

#[test]
fn metrics_trait_objects() {
    let observers: Vec<Box<dyn Metrics>> = vec![
        Box::new(NoopMetrics) as Box<dyn Metrics>,
        Box::new(InMemoryMetrics::new()),
    ];
    for m in &observers {
        m.session_opened();
        m.cache_event(CacheEvent::Hit);
        m.message_sent(MessageKind::Text, true);
        m.session_closed();
    }
}
