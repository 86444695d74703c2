use thiserror::Error;

/// PostgREST reports unique-constraint violations with the Postgres SQLSTATE.
pub const PG_UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("uniqueness constraint violated: {message}")]
    UniqueViolation { message: String },

    #[error("store API error {status} (code {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("insert into {table} returned no id")]
    MissingId { table: &'static str },

    #[error("count of {table} missing from response")]
    MissingCount { table: String },
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, msg)
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                StoreError::UniqueViolation {
                    message: msg.clone().unwrap_or_else(|| err.to_string()),
                }
            }
            _ => StoreError::Sqlite(e),
        }
    }
}
