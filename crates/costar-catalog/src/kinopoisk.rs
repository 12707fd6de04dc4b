use crate::source::CatalogSource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use costar_core::{
    ActorId, ActorRecord, CostarError, CostarResult, Metrics, MovieId, MovieRecord,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Public profile page of a person.
pub fn actor_profile_url(id: ActorId) -> String {
    format!("https://www.kinopoisk.ru/name/{id}/")
}

/// Public page of a movie.
pub fn movie_page_url(id: MovieId) -> String {
    format!("https://www.kinopoisk.ru/film/{id}/")
}

/// The API sometimes returns photo URLs with a doubled scheme.
fn repair_photo_url(url: String) -> String {
    match url.strip_prefix("https:") {
        Some(rest) if rest.starts_with("https://") => rest.to_string(),
        _ => url,
    }
}

// ── Kinopoisk API response types ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<PersonDoc>,
}

#[derive(Debug, Deserialize)]
struct PersonDoc {
    id: ActorId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "enName")]
    en_name: Option<String>,
    #[serde(default)]
    photo: Option<String>,
    #[serde(default)]
    birthday: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PersonResponse {
    #[serde(default)]
    movies: Vec<PersonMovie>,
}

#[derive(Debug, Deserialize)]
struct PersonMovie {
    id: MovieId,
    #[serde(default, rename = "enProfession")]
    profession: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MovieResponse {
    id: MovieId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "alternativeName")]
    alternative_name: Option<String>,
    #[serde(default)]
    rating: Option<Rating>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    poster: Option<Poster>,
}

#[derive(Debug, Deserialize)]
struct Rating {
    #[serde(default)]
    kp: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct Poster {
    #[serde(default)]
    url: Option<String>,
}

impl PersonDoc {
    fn into_record(self) -> ActorRecord {
        // Unparseable birthdays are dropped rather than failing the search.
        let birthday = self
            .birthday
            .as_deref()
            .and_then(|b| DateTime::parse_from_rfc3339(b).ok())
            .map(|b| b.with_timezone(&Utc));
        ActorRecord {
            id: self.id,
            name: self.name.unwrap_or_default(),
            en_name: self.en_name.unwrap_or_default(),
            photo_url: repair_photo_url(self.photo.unwrap_or_default()),
            profile_url: actor_profile_url(self.id),
            birthday,
        }
    }
}

impl MovieResponse {
    fn into_record(self) -> MovieRecord {
        MovieRecord {
            id: self.id,
            name: self.name.unwrap_or_default(),
            en_name: self.alternative_name.unwrap_or_default(),
            poster_url: self.poster.and_then(|p| p.url).unwrap_or_default(),
            rating: self.rating.and_then(|r| r.kp).unwrap_or_default(),
            year: self.year,
            link: movie_page_url(self.id),
        }
    }
}

// ── Implementation ──────────────────────────────────────────────────────────

/// Kinopoisk unofficial API client.
///
/// Every call is a single GET with the API key header. Non-success statuses
/// become [`CostarError::UpstreamStatus`] carrying the response body; every
/// status that comes back is reported to the metrics observer.
pub struct KinopoiskCatalog {
    base_url: String,
    token: String,
    client: reqwest::Client,
    metrics: Arc<dyn Metrics>,
}

impl KinopoiskCatalog {
    /// Create a new client.
    ///
    /// * `base_url` – API root, e.g. `https://api.kinopoisk.dev/v1.4/`.
    /// * `token` – Value of the `X-API-KEY` header.
    /// * `timeout` – Whole-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
        metrics: Arc<dyn Metrics>,
    ) -> CostarResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CostarError::Http(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into(),
            token: token.into(),
            client,
            metrics,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> CostarResult<T> {
        let response = self
            .client
            .get(self.endpoint(path))
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json")
            .header("X-API-KEY", &self.token)
            .send()
            .await
            .map_err(|e| CostarError::Http(format!("Kinopoisk request to {path} failed: {e}")))?;

        let status = response.status();
        self.metrics.upstream_response(status.as_u16());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(path, status = status.as_u16(), "Kinopoisk returned an error status");
            return Err(CostarError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CostarError::Catalog(format!("Kinopoisk parse error on {path}: {e}")))
    }
}

#[async_trait]
impl CatalogSource for KinopoiskCatalog {
    async fn search_actors(&self, query: &str) -> CostarResult<Vec<ActorRecord>> {
        let response: SearchResponse = self
            .get_json(
                "person/search",
                &[("page", "1"), ("limit", "20"), ("query", query)],
            )
            .await?;
        tracing::debug!(query, found = response.docs.len(), "Actor search finished");
        Ok(response
            .docs
            .into_iter()
            .map(PersonDoc::into_record)
            .collect())
    }

    async fn movies_by_actor(&self, actor_id: ActorId) -> CostarResult<Vec<MovieId>> {
        let response: PersonResponse = self.get_json(&format!("person/{actor_id}"), &[]).await?;
        Ok(response
            .movies
            .into_iter()
            .filter(|m| m.profession.as_deref() == Some("actor"))
            .map(|m| m.id)
            .collect())
    }

    async fn movie_by_id(&self, id: MovieId) -> CostarResult<MovieRecord> {
        let response: MovieResponse = self.get_json(&format!("movie/{id}"), &[]).await?;
        Ok(response.into_record())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_repair_photo_url() {
        assert_eq!(
            repair_photo_url("https:https://st.kp.yandex.net/1.jpg".into()),
            "https://st.kp.yandex.net/1.jpg"
        );
        assert_eq!(
            repair_photo_url("https://st.kp.yandex.net/1.jpg".into()),
            "https://st.kp.yandex.net/1.jpg"
        );
        assert_eq!(repair_photo_url(String::new()), "");
    }

    #[test]
    fn test_person_doc_mapping() {
        let doc: PersonDoc = serde_json::from_str(
            r#"{"id": 7, "name": "Кира Найтли", "enName": "Keira Knightley",
                "photo": "https:https://img/7.jpg", "birthday": "1985-03-26T00:00:00.000Z"}"#,
        )
        .unwrap();
        let record = doc.into_record();
        assert_eq!(record.photo_url, "https://img/7.jpg");
        assert_eq!(record.profile_url, "https://www.kinopoisk.ru/name/7/");
        assert_eq!(record.birthday.unwrap().year(), 1985);
    }

    #[test]
    fn test_person_doc_with_nulls() {
        let doc: PersonDoc =
            serde_json::from_str(r#"{"id": 8, "name": null, "enName": null, "birthday": "soon"}"#)
                .unwrap();
        let record = doc.into_record();
        assert!(record.name.is_empty());
        assert!(record.photo_url.is_empty());
        assert!(record.birthday.is_none());
    }

    #[test]
    fn test_movie_mapping_without_poster() {
        let movie: MovieResponse =
            serde_json::from_str(r#"{"id": 3, "name": "Фильм", "poster": null}"#).unwrap();
        let record = movie.into_record();
        assert_eq!(record.poster_url, "");
        assert_eq!(record.rating, 0.0);
        assert_eq!(record.link, "https://www.kinopoisk.ru/film/3/");
    }

    #[test]
    fn test_endpoint_joins_with_single_slash() {
        let metrics: Arc<dyn Metrics> = Arc::new(costar_core::NoopMetrics);
        for base in ["http://kp/v1.4", "http://kp/v1.4/"] {
            let catalog =
                KinopoiskCatalog::new(base, "key", Duration::from_secs(1), metrics.clone()).unwrap();
            assert_eq!(catalog.endpoint("movie/1"), "http://kp/v1.4/movie/1");
        }
    }
}
