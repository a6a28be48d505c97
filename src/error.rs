use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch from {provider} failed: {message}")]
    Fetch { provider: String, message: String },

    #[error("{provider} respondent {respondent}: question '{question_id}' has no field mapping")]
    UnmappedField {
        provider: String,
        respondent: usize,
        question_id: String,
    },

    #[error("{provider} respondent {respondent}: cannot format answer for '{field}': {reason}")]
    Format {
        provider: String,
        field: String,
        respondent: usize,
        reason: String,
    },

    #[error("Schema mismatch for '{label}': missing fields {missing:?}, extra fields {extra:?}")]
    SchemaMismatch {
        label: String,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("No answer tables to merge")]
    EmptyMerge,

    #[error("Table sink failed: {0}")]
    Sink(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed config: {0}")]
    Toml(#[from] toml::de::Error),
}

impl IngestError {
    /// Short stage name used for failure metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            IngestError::Config(_) | IngestError::Toml(_) => "config",
            IngestError::Fetch { .. } => "fetch",
            IngestError::UnmappedField { .. } | IngestError::Format { .. } => "extract",
            IngestError::SchemaMismatch { .. } | IngestError::EmptyMerge => "merge",
            IngestError::Sink(_) | IngestError::Io(_) | IngestError::Json(_) => "sink",
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
