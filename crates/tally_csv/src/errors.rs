use tally_core::errors::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    /// Parse and IO failures from the reader; csv errors carry record and
    /// line positions in their message.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T, E = CsvError> = std::result::Result<T, E>;
