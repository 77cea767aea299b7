use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Student {student} and teacher {teacher} are not linked by an accepted connection")]
    NotLinked { student: u32, teacher: u32 },
    #[error("{entity} is {actual}, expected {expected}")]
    InvalidState {
        entity: String,
        expected: String,
        actual: String,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl BillingError {
    pub fn invalid_state(
        entity: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidState {
            entity: entity.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for BillingError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for BillingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("Serialization error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;
