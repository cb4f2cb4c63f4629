//! Unified error model for the client.
//! One closed enum crosses the public surface. The read path (`select`)
//! returns it through `Result`; the write and setup paths propagate with `?`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A database title that discovery never registered. The rendered message
    /// is a stable contract: callers match on `Database <name> not found`.
    #[error("Database {name} not found. Make sure to call initialize() first and check the database name")]
    DatabaseNotFound { name: String },

    /// Structured error decoded from a non-2xx API response body.
    #[error("api error: HTTP {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Transport-level failure below the API (connect, TLS, timeout).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// No usable credential in the environment.
    #[error("missing api key: set NOTION_API_KEY or pass a key to Catalog::new")]
    MissingApiKey,

    /// A response body missing a structurally required field.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl Error {
    pub fn not_found<S: Into<String>>(name: S) -> Self { Error::DatabaseNotFound { name: name.into() } }
    pub fn malformed<S: Into<String>>(context: S) -> Self { Error::Malformed(context.into()) }
}
