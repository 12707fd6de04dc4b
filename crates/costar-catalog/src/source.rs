use async_trait::async_trait;
use costar_core::{ActorId, ActorRecord, CostarResult, MovieId, MovieRecord};

/// The filmography catalog. Possibly slow, possibly failing; retries, if
/// any, are the implementation's business.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// People whose name matches `query`, in the catalog's relevance order.
    async fn search_actors(&self, query: &str) -> CostarResult<Vec<ActorRecord>>;

    /// Ids of the movies the person played in.
    async fn movies_by_actor(&self, actor_id: ActorId) -> CostarResult<Vec<MovieId>>;

    /// Full movie record.
    async fn movie_by_id(&self, id: MovieId) -> CostarResult<MovieRecord>;
}
