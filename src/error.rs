use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Rejected before any remote or local effect.
    #[error("invalid input: {0}")]
    Validation(String),
    /// The remote call failed. `confirmed` ids were already mutated on both sides.
    #[error("remote call failed after {confirmed} confirmed ids: {source:#}")]
    Remote {
        confirmed: usize,
        #[source]
        source: anyhow::Error,
    },
    /// The remote side accepted a batch of `remote_applied` ids but the mirror
    /// could not record it. Those ids stay stale locally until the next sync.
    #[error(
        "local commit failed after {confirmed} confirmed ids; {remote_applied} ids changed remotely only: {source}"
    )]
    LocalCommit {
        confirmed: usize,
        remote_applied: usize,
        #[source]
        source: sqlx::Error,
    },
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl Error {
    pub fn remote(confirmed: usize, source: anyhow::Error) -> Self {
        Error::Remote { confirmed, source }
    }

    /// Status code the route layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Remote { .. } | Error::LocalCommit { .. } | Error::Storage(_) => 500,
        }
    }
}
