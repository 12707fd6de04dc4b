//! `costar.toml` loading.
//!
//! Every field has a default so a file carrying only the two tokens is a
//! valid configuration. Secrets and paths can come from the environment
//! instead, which takes precedence over the file.

use costar_catalog::RedisSettings;
use costar_core::{CostarError, CostarResult};
use costar_engine::EngineSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration of the bot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CostarConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub kinopoisk: KinopoiskConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_telegram_api(),
            poll_timeout_secs: default_poll_timeout(),
            event_buffer: default_event_buffer(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KinopoiskConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_kinopoisk_url")]
    pub base_url: String,
    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,
}

impl Default for KinopoiskConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            base_url: default_kinopoisk_url(),
            timeout_secs: default_catalog_timeout(),
        }
    }
}

impl KinopoiskConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where looked-up movies are kept between requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Every movie lookup goes to the catalog.
    None,
    #[default]
    Memory,
    /// One JSON file per movie under `cache.dir`.
    File,
    /// Shared Redis described by `[cache.redis]`.
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub redis: RedisConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            dir: default_cache_dir(),
            redis: RedisConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_host")]
    pub host: String,
    #[serde(default)]
    pub db: i64,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_redis_retries")]
    pub max_retries: usize,
    #[serde(default = "default_redis_timeout")]
    pub dial_timeout_secs: u64,
    #[serde(default = "default_redis_timeout")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_redis_timeout")]
    pub write_timeout_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            db: 0,
            user: None,
            password: None,
            max_retries: default_redis_retries(),
            dial_timeout_secs: default_redis_timeout(),
            read_timeout_secs: default_redis_timeout(),
            write_timeout_secs: default_redis_timeout(),
        }
    }
}

impl RedisConfig {
    pub fn settings(&self) -> RedisSettings {
        RedisSettings {
            host: self.host.clone(),
            db: self.db,
            user: self.user.clone(),
            password: self.password.clone(),
            max_retries: self.max_retries,
            dial_timeout: Duration::from_secs(self.dial_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            write_timeout: Duration::from_secs(self.write_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
    #[serde(default = "default_max_rendered")]
    pub max_rendered_movies: usize,
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            send_timeout_secs: default_send_timeout(),
            max_rendered_movies: default_max_rendered(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl EngineConfig {
    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            send_timeout: Duration::from_secs(self.send_timeout_secs),
            max_rendered_movies: self.max_rendered_movies,
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    #[serde(default = "default_status_enabled")]
    pub enabled: bool,
    #[serde(default = "default_status_addr")]
    pub addr: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: default_status_enabled(),
            addr: default_status_addr(),
        }
    }
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}
fn default_poll_timeout() -> u64 {
    30
}
fn default_event_buffer() -> usize {
    256
}
fn default_kinopoisk_url() -> String {
    "https://api.kinopoisk.dev/v1.4/".to_string()
}
fn default_catalog_timeout() -> u64 {
    10
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("./data/movies")
}
fn default_redis_host() -> String {
    "127.0.0.1:6379".to_string()
}
fn default_redis_retries() -> usize {
    3
}
fn default_redis_timeout() -> u64 {
    5
}
fn default_send_timeout() -> u64 {
    5
}
fn default_max_rendered() -> usize {
    10
}
fn default_shutdown_grace() -> u64 {
    5
}
fn default_status_enabled() -> bool {
    true
}
fn default_status_addr() -> String {
    "127.0.0.1:9090".to_string()
}

impl CostarConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> CostarResult<Self> {
        toml::from_str(raw).map_err(|e| CostarError::Config(format!("Invalid config: {e}")))
    }

    /// Read `path` (a missing file means all defaults), then apply the
    /// process environment.
    pub async fn load(path: &Path) -> CostarResult<Self> {
        let mut config = match tokio::fs::read_to_string(path).await {
            Ok(raw) => Self::from_toml_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            Err(e) => {
                return Err(CostarError::Config(format!(
                    "Failed to read config file '{}': {e}",
                    path.display()
                )))
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override secrets and paths from `lookup` (normally the environment).
    /// Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = lookup("TELEGRAM_TOKEN") {
            self.telegram.token = token;
        }
        if let Some(token) = lookup("KINOPOISK_TOKEN") {
            self.kinopoisk.token = token;
        }
        if let Some(url) = lookup("KINOPOISK_PATH") {
            self.kinopoisk.base_url = url;
        }
        if let Some(dir) = lookup("COSTAR_CACHE_DIR") {
            self.cache.backend = CacheBackend::File;
            self.cache.dir = PathBuf::from(dir);
        }

        let redis = &mut self.cache.redis;
        if let Some(host) = lookup("REDIS_HOST") {
            self.cache.backend = CacheBackend::Redis;
            redis.host = host;
        }
        if let Some(user) = lookup("REDIS_USER") {
            redis.user = Some(user);
        }
        if let Some(password) = lookup("REDIS_PASSWORD") {
            redis.password = Some(password);
        }
        parse_env(&lookup, "REDIS_DB", &mut redis.db);
        parse_env(&lookup, "REDIS_MAX_RETRIES", &mut redis.max_retries);
        parse_env(&lookup, "REDIS_DIAL_TIMEOUT", &mut redis.dial_timeout_secs);
        parse_env(&lookup, "REDIS_READ_TIMEOUT", &mut redis.read_timeout_secs);
        parse_env(&lookup, "REDIS_WRITE_TIMEOUT", &mut redis.write_timeout_secs);
    }

    /// Refuse to start without credentials or with unusable limits.
    pub fn validate(&self) -> CostarResult<()> {
        if self.telegram.token.trim().is_empty() {
            return Err(CostarError::Config(
                "telegram.token is not set (or TELEGRAM_TOKEN)".into(),
            ));
        }
        if self.kinopoisk.token.trim().is_empty() {
            return Err(CostarError::Config(
                "kinopoisk.token is not set (or KINOPOISK_TOKEN)".into(),
            ));
        }
        if self.telegram.event_buffer == 0 {
            return Err(CostarError::Config(
                "telegram.event_buffer must be positive".into(),
            ));
        }
        if self.engine.send_timeout_secs == 0 {
            return Err(CostarError::Config(
                "engine.send_timeout_secs must be positive".into(),
            ));
        }
        if self.cache.backend == CacheBackend::Redis && self.cache.redis.host.trim().is_empty() {
            return Err(CostarError::Config(
                "cache.redis.host is not set (or REDIS_HOST)".into(),
            ));
        }
        Ok(())
    }
}

/// Numeric override; a value that does not parse is logged and skipped.
fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(_) => tracing::warn!(key, value = %raw, "Ignoring unparsable environment value"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = CostarConfig::from_toml_str("").unwrap();
        assert_eq!(config.kinopoisk.base_url, "https://api.kinopoisk.dev/v1.4/");
        assert_eq!(config.kinopoisk.timeout(), Duration::from_secs(10));
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.engine.settings().send_timeout, Duration::from_secs(5));
        assert_eq!(config.engine.settings().max_rendered_movies, 10);
        assert_eq!(config.engine.shutdown_grace(), Duration::from_secs(5));
        assert!(config.status.enabled);
    }

    #[test]
    fn test_partial_sections() {
        let config = CostarConfig::from_toml_str(
            r#"
            [telegram]
            token = "tg"

            [cache]
            backend = "none"

            [engine]
            max_rendered_movies = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.telegram.token, "tg");
        assert_eq!(config.telegram.poll_timeout_secs, 30);
        assert_eq!(config.cache.backend, CacheBackend::None);
        assert_eq!(config.engine.max_rendered_movies, 3);
        assert_eq!(config.engine.send_timeout_secs, 5);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let err = CostarConfig::from_toml_str("[cache]\nbackend = \"memcached\"").unwrap_err();
        assert!(matches!(err, CostarError::Config(_)));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config =
            CostarConfig::from_toml_str("[telegram]\ntoken = \"from-file\"").unwrap();
        config.apply_env(env(&[
            ("TELEGRAM_TOKEN", "from-env"),
            ("KINOPOISK_TOKEN", "kp"),
            ("KINOPOISK_PATH", "http://localhost:8080/v1.4/"),
            ("COSTAR_CACHE_DIR", "/var/cache/costar"),
        ]));
        assert_eq!(config.telegram.token, "from-env");
        assert_eq!(config.kinopoisk.token, "kp");
        assert_eq!(config.kinopoisk.base_url, "http://localhost:8080/v1.4/");
        assert_eq!(config.cache.backend, CacheBackend::File);
        assert_eq!(config.cache.dir, PathBuf::from("/var/cache/costar"));
    }

    #[test]
    fn test_redis_section() {
        let config = CostarConfig::from_toml_str(
            r#"
            [cache]
            backend = "redis"

            [cache.redis]
            host = "redis.internal:6380"
            db = 2
            password = "secret"
            read_timeout_secs = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.backend, CacheBackend::Redis);
        let settings = config.cache.redis.settings();
        assert_eq!(settings.host, "redis.internal:6380");
        assert_eq!(settings.db, 2);
        assert_eq!(settings.user, None);
        assert_eq!(settings.password.as_deref(), Some("secret"));
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.dial_timeout, Duration::from_secs(5));
        assert_eq!(settings.read_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_redis_env_selects_backend() {
        let mut config = CostarConfig::default();
        config.apply_env(env(&[
            ("REDIS_HOST", "cache:6379"),
            ("REDIS_DB", "4"),
            ("REDIS_USER", "bot"),
            ("REDIS_PASSWORD", "pw"),
            ("REDIS_MAX_RETRIES", "not-a-number"),
            ("REDIS_WRITE_TIMEOUT", "2"),
        ]));
        assert_eq!(config.cache.backend, CacheBackend::Redis);
        let redis = &config.cache.redis;
        assert_eq!(redis.host, "cache:6379");
        assert_eq!(redis.db, 4);
        assert_eq!(redis.user.as_deref(), Some("bot"));
        assert_eq!(redis.password.as_deref(), Some("pw"));
        assert_eq!(redis.max_retries, 3);
        assert_eq!(redis.write_timeout_secs, 2);
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config =
            CostarConfig::from_toml_str("[telegram]\ntoken = \"from-file\"").unwrap();
        config.apply_env(env(&[("TELEGRAM_TOKEN", "  "), ("COSTAR_CACHE_DIR", "")]));
        assert_eq!(config.telegram.token, "from-file");
        assert_eq!(config.cache.backend, CacheBackend::Memory);
    }

    #[test]
    fn test_validation_requires_both_tokens() {
        let mut config = CostarConfig::default();
        assert!(config.validate().is_err());

        config.telegram.token = "tg".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("kinopoisk.token"));

        config.kinopoisk.token = "kp".into();
        assert!(config.validate().is_ok());

        config.engine.send_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CostarConfig::load(&dir.path().join("absent.toml"))
            .await
            .unwrap();
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
    }

    #[tokio::test]
    async fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("costar.toml");
        tokio::fs::write(&path, "[status]\naddr = \"0.0.0.0:9999\"\nenabled = false\n")
            .await
            .unwrap();
        let config = CostarConfig::load(&path).await.unwrap();
        assert_eq!(config.status.addr, "0.0.0.0:9999");
        assert!(!config.status.enabled);
    }
}
