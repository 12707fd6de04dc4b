use thiserror::Error;

/// A convenience `Result` alias using [`CostarError`].
pub type CostarResult<T> = Result<T, CostarError>;

/// Top-level error type shared by every costar crate.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Error, Debug)]
pub enum CostarError {
    /// The filmography catalog could not be reached or returned garbage.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// The filmography catalog answered with a non-success status.
    #[error("Upstream returned status {status}: {body}")]
    UpstreamStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// The fast store failed (unreachable, timed out, corrupt entry).
    #[error("Cache error: {0}")]
    Cache(String),

    /// The messaging gateway rejected or failed a delivery.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// An operation ran past its deadline and was abandoned.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// A session transition was refused.
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration could not be parsed or failed validation.
    #[error("Config error: {0}")]
    Config(String),

    /// User input that cannot be acted on.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
