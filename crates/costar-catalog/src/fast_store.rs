use async_trait::async_trait;
use costar_core::{CostarError, CostarResult, MovieId, MovieRecord};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Secondary store for movie records.
///
/// `Ok(None)` is a definitive "not stored"; `Err` means the store itself
/// failed (unreachable, timed out, corrupt entry).
#[async_trait]
pub trait FastStore: Send + Sync {
    /// Fetch a stored movie.
    async fn get_movie(&self, id: MovieId) -> CostarResult<Option<MovieRecord>>;

    /// Store a movie, replacing any previous record with the same id.
    async fn put_movie(&self, movie: &MovieRecord) -> CostarResult<()>;
}

/// Process-local store. Lost on restart.
pub struct InMemoryFastStore {
    movies: RwLock<HashMap<MovieId, MovieRecord>>,
}

impl InMemoryFastStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            movies: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored movies.
    pub async fn len(&self) -> usize {
        self.movies.read().await.len()
    }
}

impl Default for InMemoryFastStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FastStore for InMemoryFastStore {
    async fn get_movie(&self, id: MovieId) -> CostarResult<Option<MovieRecord>> {
        Ok(self.movies.read().await.get(&id).cloned())
    }

    async fn put_movie(&self, movie: &MovieRecord) -> CostarResult<()> {
        self.movies.write().await.insert(movie.id, movie.clone());
        Ok(())
    }
}

/// One JSON file per movie. Survives restarts and can be shared by several
/// processes on the same host.
pub struct FileFastStore {
    dir: PathBuf,
    write_seq: AtomicU64,
}

impl FileFastStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub async fn new(dir: PathBuf) -> CostarResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_seq: AtomicU64::new(0),
        })
    }

    fn movie_path(&self, id: MovieId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl FastStore for FileFastStore {
    async fn get_movie(&self, id: MovieId) -> CostarResult<Option<MovieRecord>> {
        let data = match tokio::fs::read_to_string(self.movie_path(id)).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CostarError::Cache(format!(
                    "Failed to read movie {id}: {e}"
                )))
            }
        };
        let movie = serde_json::from_str(&data)
            .map_err(|e| CostarError::Cache(format!("Corrupt entry for movie {id}: {e}")))?;
        Ok(Some(movie))
    }

    async fn put_movie(&self, movie: &MovieRecord) -> CostarResult<()> {
        let json = serde_json::to_string(movie)?;
        // Write-then-rename so readers never see a half-written file.
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .dir
            .join(format!("{}.json.{}-{seq}.tmp", movie.id, std::process::id()));
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| CostarError::Cache(format!("Failed to write movie {}: {e}", movie.id)))?;
        tokio::fs::rename(&tmp, self.movie_path(movie.id))
            .await
            .map_err(|e| CostarError::Cache(format!("Failed to store movie {}: {e}", movie.id)))?;
        Ok(())
    }
}
