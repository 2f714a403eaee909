use crate::value::DataType;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: DataType, found: String },

    #[error("row has {found} values, schema has {expected} fields")]
    ArityMismatch { expected: usize, found: usize },

    #[error("null value in non-nullable field '{field}'")]
    NullNotAllowed { field: String },

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("unknown backend '{0}', expected 'postgres', 'memory' or 'distributed'")]
    UnknownBackend(String),

    #[error("unknown report '{0}'")]
    UnknownReport(String),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
