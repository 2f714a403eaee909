use tally_postgres::errors::PostgresError;

#[derive(Debug, thiserror::Error)]
pub enum DistExecError {
    #[error(transparent)]
    Postgres(#[from] PostgresError),

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T, E = DistExecError> = std::result::Result<T, E>;
