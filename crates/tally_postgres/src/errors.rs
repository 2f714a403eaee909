use tally_core::errors::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[error("invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("table already exists: {0}")]
    TableExists(String),

    #[error("unsupported column type for '{column}': {data_type}")]
    UnsupportedColumnType { column: String, data_type: String },

    #[error("schema mismatch for table '{table}': {detail}")]
    SchemaMismatch { table: String, detail: String },

    #[error("unknown write mode '{0}', expected 'fail', 'replace' or 'append'")]
    UnknownWriteMode(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T, E = PostgresError> = std::result::Result<T, E>;
