#![allow(clippy::unwrap_used, clippy::expect_used)]

use costar_catalog::{CatalogSource, KinopoiskCatalog};
use costar_core::{CostarError, InMemoryMetrics};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn catalog(server: &MockServer, metrics: Arc<InMemoryMetrics>) -> KinopoiskCatalog {
    KinopoiskCatalog::new(
        format!("{}/v1.4/", server.uri()),
        "secret",
        Duration::from_secs(2),
        metrics,
    )
    .unwrap()
}

#[tokio::test]
async fn test_search_actors_maps_docs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.4/person/search"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "20"))
        .and(query_param("query", "Кира Найтли"))
        .and(header("X-API-KEY", "secret"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "docs": [
                {
                    "id": 7,
                    "name": "Кира Найтли",
                    "enName": "Keira Knightley",
                    "photo": "https:https://st.kp.yandex.net/images/actor_iphone/iphone360_7.jpg",
                    "birthday": "1985-03-26T00:00:00.000Z"
                },
                { "id": 8, "name": "Кира Найтли-старшая", "enName": null, "photo": null }
            ],
            "total": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let metrics = Arc::new(InMemoryMetrics::new());
    let actors = catalog(&server, metrics.clone())
        .search_actors("Кира Найтли")
        .await
        .unwrap();

    assert_eq!(actors.len(), 2);
    assert_eq!(actors[0].id, 7);
    assert_eq!(
        actors[0].photo_url,
        "https://st.kp.yandex.net/images/actor_iphone/iphone360_7.jpg"
    );
    assert_eq!(actors[0].profile_url, "https://www.kinopoisk.ru/name/7/");
    assert_eq!(
        actors[0].caption(),
        "Кира Найтли (Keira Knightley), 1985"
    );
    assert!(actors[1].photo_url.is_empty());
    assert_eq!(metrics.snapshot().upstream.get(&200), Some(&1));
}

#[tokio::test]
async fn test_filmography_keeps_acting_roles_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.4/person/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "movies": [
                { "id": 100, "enProfession": "actor" },
                { "id": 101, "enProfession": "producer" },
                { "id": 102, "enProfession": "actor" },
                { "id": 103 }
            ]
        })))
        .mount(&server)
        .await;

    let ids = catalog(&server, Arc::new(InMemoryMetrics::new()))
        .movies_by_actor(7)
        .await
        .unwrap();
    assert_eq!(ids, vec![100, 102]);
}

#[tokio::test]
async fn test_movie_by_id_maps_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.4/movie/4374"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4374,
            "name": "Пираты Карибского моря: Проклятие Черной жемчужины",
            "alternativeName": "Pirates of the Caribbean: The Curse of the Black Pearl",
            "year": 2003,
            "rating": { "kp": 8.34, "imdb": 8.1 },
            "poster": { "url": "https://image.openmoviedb.com/4374.jpg" },
            "description": "ignored"
        })))
        .mount(&server)
        .await;

    let movie = catalog(&server, Arc::new(InMemoryMetrics::new()))
        .movie_by_id(4374)
        .await
        .unwrap();
    assert_eq!(movie.id, 4374);
    assert_eq!(
        movie.en_name,
        "Pirates of the Caribbean: The Curse of the Black Pearl"
    );
    assert_eq!(movie.year, Some(2003));
    assert!((movie.rating - 8.34).abs() < 1e-4);
    assert_eq!(movie.poster_url, "https://image.openmoviedb.com/4374.jpg");
    assert_eq!(movie.link, "https://www.kinopoisk.ru/film/4374/");
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.4/movie/1"))
        .respond_with(ResponseTemplate::new(403).set_body_string("daily limit reached"))
        .mount(&server)
        .await;

    let metrics = Arc::new(InMemoryMetrics::new());
    let err = catalog(&server, metrics.clone())
        .movie_by_id(1)
        .await
        .unwrap_err();
    match err {
        CostarError::UpstreamStatus { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "daily limit reached");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(metrics.snapshot().upstream.get(&403), Some(&1));
}

#[tokio::test]
async fn test_malformed_body_is_a_catalog_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.4/person/2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = catalog(&server, Arc::new(InMemoryMetrics::new()))
        .movies_by_actor(2)
        .await
        .unwrap_err();
    assert!(matches!(err, CostarError::Catalog(_)));
}

#[tokio::test]
async fn test_missing_api_key_header_is_not_matched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("X-API-KEY", "other-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "docs": [] })))
        .mount(&server)
        .await;

    // Unmatched requests get wiremock's default 404.
    let err = catalog(&server, Arc::new(InMemoryMetrics::new()))
        .search_actors("x")
        .await
        .unwrap_err();
    assert!(matches!(err, CostarError::UpstreamStatus { status: 404, .. }));
}
