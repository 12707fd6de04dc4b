use async_trait::async_trait;
use costar_core::{CostarError, CostarResult, MovieId, MovieRecord};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, IntoConnectionInfo};
use std::time::Duration;

use crate::fast_store::FastStore;

/// Prefix of every movie key.
pub const KEY_PREFIX: &str = "movie:";

/// Where and how to reach Redis.
#[derive(Debug, Clone)]
pub struct RedisSettings {
    /// `host:port`.
    pub host: String,
    /// Logical database number.
    pub db: i64,
    /// ACL user, if any.
    pub user: Option<String>,
    /// Password, if any.
    pub password: Option<String>,
    /// Reconnect attempts before a command fails.
    pub max_retries: usize,
    /// Deadline for establishing the connection.
    pub dial_timeout: Duration,
    /// Deadline for a read.
    pub read_timeout: Duration,
    /// Deadline for a write.
    pub write_timeout: Duration,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1:6379".into(),
            db: 0,
            user: None,
            password: None,
            max_retries: 3,
            dial_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
        }
    }
}

/// Movies as JSON strings under `movie:<id>`, shared by every process that
/// points at the same Redis.
///
/// The connection manager reconnects on its own after the initial connect,
/// so a Redis restart shows up as a few failed reads and writes rather than
/// a dead store.
pub struct RedisFastStore {
    conn: ConnectionManager,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl RedisFastStore {
    /// Connect to Redis. Fails if no connection is up within the dial
    /// timeout.
    pub async fn connect(settings: &RedisSettings) -> CostarResult<Self> {
        let mut info = format!("redis://{}/{}", settings.host, settings.db)
            .into_connection_info()
            .map_err(|e| CostarError::Cache(format!("Invalid Redis address: {e}")))?;
        info.redis.username.clone_from(&settings.user);
        info.redis.password.clone_from(&settings.password);

        let client = redis::Client::open(info)
            .map_err(|e| CostarError::Cache(format!("Invalid Redis settings: {e}")))?;
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(settings.max_retries)
            .set_connection_timeout(settings.dial_timeout)
            .set_response_timeout(settings.read_timeout.max(settings.write_timeout));
        let conn = tokio::time::timeout(
            settings.dial_timeout,
            client.get_connection_manager_with_config(config),
        )
        .await
        .map_err(|_| CostarError::Cache(format!("Redis at {} did not answer", settings.host)))?
        .map_err(|e| CostarError::Cache(format!("Redis at {} unreachable: {e}", settings.host)))?;

        tracing::info!(host = %settings.host, db = settings.db, "Connected to Redis");
        Ok(Self {
            conn,
            read_timeout: settings.read_timeout,
            write_timeout: settings.write_timeout,
        })
    }
}

fn movie_key(id: MovieId) -> String {
    format!("{KEY_PREFIX}{id}")
}

fn decode(id: MovieId, raw: Option<String>) -> CostarResult<Option<MovieRecord>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| CostarError::Cache(format!("Corrupt entry for movie {id}: {e}")))
}

#[async_trait]
impl FastStore for RedisFastStore {
    async fn get_movie(&self, id: MovieId) -> CostarResult<Option<MovieRecord>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = tokio::time::timeout(self.read_timeout, conn.get(movie_key(id)))
            .await
            .map_err(|_| CostarError::Cache(format!("Read of movie {id} timed out")))?
            .map_err(|e| CostarError::Cache(format!("Failed to read movie {id}: {e}")))?;
        decode(id, raw)
    }

    async fn put_movie(&self, movie: &MovieRecord) -> CostarResult<()> {
        let json = serde_json::to_string(movie)?;
        let mut conn = self.conn.clone();
        tokio::time::timeout(
            self.write_timeout,
            conn.set::<_, _, ()>(movie_key(movie.id), json),
        )
        .await
        .map_err(|_| CostarError::Cache(format!("Write of movie {} timed out", movie.id)))?
        .map_err(|e| CostarError::Cache(format!("Failed to write movie {}: {e}", movie.id)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_key() {
        assert_eq!(movie_key(326), "movie:326");
    }

    #[test]
    fn test_decode_missing_key_is_not_stored() {
        assert_eq!(decode(1, None).unwrap(), None);
    }

    #[test]
    fn test_decode_corrupt_entry_is_an_error() {
        let err = decode(1, Some("{not json".into())).unwrap_err();
        assert!(matches!(err, CostarError::Cache(_)));
    }

    #[test]
    fn test_decode_stored_movie() {
        let movie = MovieRecord {
            id: 7,
            name: "Movie 7".into(),
            en_name: String::new(),
            poster_url: "https://img/7.jpg".into(),
            rating: 6.9,
            year: Some(2003),
            link: "https://www.kinopoisk.ru/film/7/".into(),
        };
        let raw = serde_json::to_string(&movie).unwrap();
        assert_eq!(decode(7, Some(raw)).unwrap(), Some(movie));
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        // Bind then drop to get a port nothing listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let settings = RedisSettings {
            host: format!("127.0.0.1:{port}"),
            max_retries: 0,
            dial_timeout: Duration::from_secs(2),
            ..RedisSettings::default()
        };
        let err = RedisFastStore::connect(&settings).await.err().unwrap();
        assert!(matches!(err, CostarError::Cache(_)));
    }
}
