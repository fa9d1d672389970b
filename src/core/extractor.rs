use crate::common::{FaceMatchError, FaceSelection, Result};
use crate::core::backend::FaceBackend;
use crate::core::detector::FaceBox;
use crate::core::recognizer::Embedding;
use std::sync::Arc;

/// Image bytes in, one face embedding out.
#[derive(Clone)]
pub struct EmbeddingExtractor {
    backend: Arc<dyn FaceBackend>,
    selection: FaceSelection,
    embedding_dim: usize,
}

impl EmbeddingExtractor {
    pub fn new(backend: Arc<dyn FaceBackend>, selection: FaceSelection, embedding_dim: usize) -> Self {
        Self { backend, selection, embedding_dim }
    }

    /// Decodes `image_bytes`, picks a face and embeds it.
    ///
    /// Fails with [`FaceMatchError::Decode`] for bytes that are not an image and
    /// [`FaceMatchError::NoFaceDetected`] when the detector finds nothing. An
    /// embedding whose length differs from the configured model dimension is a
    /// [`FaceMatchError::Model`] error.
    pub fn extract(&self, image_bytes: &[u8]) -> Result<Embedding> {
        let image = image::load_from_memory(image_bytes).map_err(FaceMatchError::Decode)?;

        let faces = self.backend.detect(&image)?;
        let face = select_face(&faces, self.selection).ok_or(FaceMatchError::NoFaceDetected)?;
        if faces.len() > 1 {
            tracing::debug!(
                "{} faces detected, using {:?} policy (confidence {:.2})",
                faces.len(),
                self.selection,
                face.confidence
            );
        }

        let embedding = self.backend.embed(&image, face)?;
        if embedding.len() != self.embedding_dim {
            return Err(FaceMatchError::Model(format!(
                "Recognizer produced a {}-dimensional embedding, expected {}",
                embedding.len(),
                self.embedding_dim
            )));
        }

        Ok(embedding)
    }
}

pub fn select_face(faces: &[FaceBox], selection: FaceSelection) -> Option<&FaceBox> {
    match selection {
        FaceSelection::First => faces.first(),
        // Earliest wins on equal area
        FaceSelection::Largest => faces.iter().reduce(|best, face| {
            if face.area() > best.area() {
                face
            } else {
                best
            }
        }),
    }
}
