use crate::detached::DetachedWork;
use crate::fast_store::FastStore;
use crate::source::CatalogSource;
use async_trait::async_trait;
use costar_core::{
    ActorId, ActorRecord, CacheEvent, CostarResult, Metrics, MovieId, MovieRecord,
};
use std::sync::Arc;

/// What the conversation engine uses to reach the catalog.
#[async_trait]
pub trait MovieLookup: Send + Sync {
    /// People whose name matches `query`. Never cached.
    async fn search_actors(&self, query: &str) -> CostarResult<Vec<ActorRecord>>;

    /// Ids of the movies the person played in. Never cached.
    async fn movies_by_actor(&self, actor_id: ActorId) -> CostarResult<Vec<MovieId>>;

    /// Full movie record, possibly served from a fast store.
    async fn movie_by_id(&self, id: MovieId) -> CostarResult<MovieRecord>;
}

/// Forwards every call to the source unchanged.
pub struct PassThroughLookup {
    source: Arc<dyn CatalogSource>,
}

impl PassThroughLookup {
    /// Wrap `source`.
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl MovieLookup for PassThroughLookup {
    async fn search_actors(&self, query: &str) -> CostarResult<Vec<ActorRecord>> {
        self.source.search_actors(query).await
    }

    async fn movies_by_actor(&self, actor_id: ActorId) -> CostarResult<Vec<MovieId>> {
        self.source.movies_by_actor(actor_id).await
    }

    async fn movie_by_id(&self, id: MovieId) -> CostarResult<MovieRecord> {
        self.source.movie_by_id(id).await
    }
}

/// Cache-aside movie lookup.
///
/// A fast-store hit is returned as is. On a miss, or when the fast store
/// fails, the source is consulted and its answer returned immediately while
/// the write-back runs as detached work. Neither a failing read nor a
/// failing write ever reaches the caller; source errors do, unchanged.
pub struct CacheAsideLookup {
    source: Arc<dyn CatalogSource>,
    store: Arc<dyn FastStore>,
    metrics: Arc<dyn Metrics>,
    backfill: DetachedWork,
}

impl CacheAsideLookup {
    /// Combine a source and a fast store. Backfills run on `backfill`.
    pub fn new(
        source: Arc<dyn CatalogSource>,
        store: Arc<dyn FastStore>,
        metrics: Arc<dyn Metrics>,
        backfill: DetachedWork,
    ) -> Self {
        Self {
            source,
            store,
            metrics,
            backfill,
        }
    }

    fn schedule_backfill(&self, movie: MovieRecord) {
        let store = self.store.clone();
        let metrics = self.metrics.clone();
        self.backfill.spawn("movie_backfill", async move {
            let result = store.put_movie(&movie).await;
            if result.is_err() {
                metrics.cache_event(CacheEvent::WriteError);
            }
            result
        });
    }
}

#[async_trait]
impl MovieLookup for CacheAsideLookup {
    async fn search_actors(&self, query: &str) -> CostarResult<Vec<ActorRecord>> {
        self.source.search_actors(query).await
    }

    async fn movies_by_actor(&self, actor_id: ActorId) -> CostarResult<Vec<MovieId>> {
        self.source.movies_by_actor(actor_id).await
    }

    async fn movie_by_id(&self, id: MovieId) -> CostarResult<MovieRecord> {
        match self.store.get_movie(id).await {
            Ok(Some(movie)) => {
                self.metrics.cache_event(CacheEvent::Hit);
                return Ok(movie);
            }
            Ok(None) => {
                self.metrics.cache_event(CacheEvent::Miss);
            }
            Err(e) => {
                tracing::warn!(movie_id = id, error = %e, "Fast store read failed, falling back to catalog");
                self.metrics.cache_event(CacheEvent::Error);
                self.metrics.cache_event(CacheEvent::Miss);
            }
        }

        let movie = self.source.movie_by_id(id).await?;
        self.schedule_backfill(movie.clone());
        Ok(movie)
    }
}

/// Pick the lookup for the configured deployment: cache-aside when a fast
/// store is available, pass-through otherwise.
pub fn build_movie_lookup(
    source: Arc<dyn CatalogSource>,
    store: Option<Arc<dyn FastStore>>,
    metrics: Arc<dyn Metrics>,
    backfill: &DetachedWork,
) -> Arc<dyn MovieLookup> {
    match store {
        Some(store) => {
            tracing::info!("Movie lookups are cached");
            Arc::new(CacheAsideLookup::new(
                source,
                store,
                metrics,
                backfill.clone(),
            ))
        }
        None => {
            tracing::info!("Movie lookups go straight to the catalog");
            Arc::new(PassThroughLookup::new(source))
        }
    }
}
