//! Access to the filmography catalog.
//!
//! The conversation engine only sees [`MovieLookup`]. Two implementations
//! exist and are picked at construction time by [`build_movie_lookup`]:
//!
//! - [`PassThroughLookup`]: every call goes to the [`CatalogSource`].
//! - [`CacheAsideLookup`]: movie-by-id lookups are served from a
//!   [`FastStore`] when possible and backfilled in the background otherwise.
//!
//! Actor searches and filmographies are never cached.

/// Background work whose result nobody awaits.
pub mod detached;
/// Secondary stores for movie records.
pub mod fast_store;
/// HTTP client for the Kinopoisk API.
pub mod kinopoisk;
/// The engine-facing lookup and its two implementations.
pub mod lookup;
/// Redis-backed fast store.
pub mod redis_store;
/// The source of truth.
pub mod source;

pub use detached::DetachedWork;
pub use fast_store::{FastStore, FileFastStore, InMemoryFastStore};
pub use kinopoisk::KinopoiskCatalog;
pub use lookup::{build_movie_lookup, CacheAsideLookup, MovieLookup, PassThroughLookup};
pub use redis_store::{RedisFastStore, RedisSettings};
pub use source::CatalogSource;
