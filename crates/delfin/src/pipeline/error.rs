use thiserror::Error;

use super::context::CaptureState;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("A capture is already in progress ({state})")]
    Busy { state: CaptureState },

    #[error("Unknown or expired capture session")]
    UnknownSession,

    #[error("Capture session is not awaiting review ({state})")]
    InvalidState { state: CaptureState },

    #[error("Error al procesar la imagen: {0}")]
    Extraction(#[from] crate::extract::ExtractionError),

    #[error("Error al guardar el pedido: {0}")]
    Storage(#[from] crate::db::DatabaseError),

    #[error("{0}")]
    Export(#[from] crate::export::ExportError),

    #[error("{0}")]
    Credential(#[from] crate::credentials::CredentialError),
}
