use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaceMatchError {
    #[error("Could not decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("No face detected")]
    NoFaceDetected,

    #[error("Embedding dimension mismatch: query has {expected} values, stored embedding has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Inference did not finish within {0:?}")]
    InferenceTimeout(Duration),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Student not found: {0}")]
    StudentNotFound(String),

    #[error("Student ID already registered: {0}")]
    DuplicateStudent(String),

    #[error("Invalid student record: {0}")]
    InvalidStudent(String),

    #[error("No data provided for update")]
    EmptyUpdate,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ORT error: {0}")]
    Ort(#[from] ort::OrtError),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl FaceMatchError {
    /// Decode failures and empty detections are the same thing to a caller:
    /// the photo has to be retaken.
    pub fn is_no_usable_face(&self) -> bool {
        matches!(self, FaceMatchError::Decode(_) | FaceMatchError::NoFaceDetected)
    }
}

pub type Result<T> = std::result::Result<T, FaceMatchError>;
