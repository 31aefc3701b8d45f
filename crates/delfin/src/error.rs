use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DelfinError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::db::DatabaseError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] crate::extract::ExtractionError),

    #[error("Export error: {0}")]
    Export(#[from] crate::export::ExportError),

    #[error("Credential error: {0}")]
    Credential(#[from] crate::credentials::CredentialError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

pub type Result<T> = std::result::Result<T, DelfinError>;
