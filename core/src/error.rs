use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("File is empty or missing data rows")]
    EmptyInput,

    #[error("Column 'Email' not found. Please check your CSV headers. Found: {}", headers.join(", "))]
    MissingRequiredColumn { headers: Vec<String> },

    #[error("Dataset version '{id}' not found")]
    VersionNotFound { id: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type IngestResult<T> = Result<T, IngestError>;
