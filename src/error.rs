//! Error types shared by the pipeline and the query service.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network or API failure while retrieving releases for a repository.
    #[error("failed to fetch releases for {repository}: {message}")]
    Fetch { repository: String, message: String },

    /// A raw release record could not be turned into a [`crate::release::ReleaseEvent`].
    #[error("malformed release in {repository}: {reason}")]
    MalformedEvent { repository: String, reason: String },

    #[error("failed to write table {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read table {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The query service could not load one of its tables.
    #[error("failed to load table {}: {message}", path.display())]
    StartupLoad { path: PathBuf, message: String },

    /// A persisted row could not be decoded back into a record.
    #[error("table row {row}: {message}")]
    Table { row: usize, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn fetch(repository: &str, message: impl ToString) -> Self {
        Error::Fetch {
            repository: repository.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: impl Into<std::io::Error>) -> Self {
        Error::Write {
            path: path.into(),
            source: source.into(),
        }
    }
}
