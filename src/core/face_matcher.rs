use crate::common::{Config, MatchingProfile, Result};
use crate::core::backend::{FaceBackend, OnnxBackend};
use crate::core::extractor::EmbeddingExtractor;
use crate::core::matcher::{best_match, Candidate, FaceMatch};
use crate::core::recognizer::Embedding;
use crate::core::worker::InferencePool;
use std::sync::Arc;
use std::time::Instant;

/// Stateless extraction + matching component.
///
/// Built once at startup and shared by reference between request handlers.
/// Extraction runs on the inference pool, so concurrent callers do not queue
/// behind each other on their own threads.
pub struct FaceMatcher {
    extractor: EmbeddingExtractor,
    pool: InferencePool,
    profile: MatchingProfile,
}

impl FaceMatcher {
    pub fn new(backend: Arc<dyn FaceBackend>, config: &Config) -> Result<Self> {
        let extractor = EmbeddingExtractor::new(
            backend,
            config.detector.face_selection,
            config.matching.embedding_dim,
        );
        let pool = InferencePool::new(config.worker.threads, config.worker.inference_timeout())?;

        tracing::info!(
            "Face matcher ready: model {} ({} dims), threshold {}",
            config.matching.model_name,
            config.matching.embedding_dim,
            config.matching.threshold
        );

        Ok(Self {
            extractor,
            pool,
            profile: config.matching.clone(),
        })
    }

    /// Loads the ONNX models named in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = Arc::new(OnnxBackend::new(config)?);
        Self::new(backend, config)
    }

    pub fn extract_embedding(&self, image_bytes: Vec<u8>) -> Result<Embedding> {
        let extractor = self.extractor.clone();
        let image_len = image_bytes.len();
        let start = Instant::now();

        let result = self.pool.run(move || extractor.extract(&image_bytes));

        match &result {
            Ok(_) => tracing::debug!(
                "Extracted embedding from {} byte image in {:.1}ms",
                image_len,
                start.elapsed().as_secs_f32() * 1000.0
            ),
            Err(e) if e.is_no_usable_face() => {
                tracing::warn!("No usable face in {} byte image: {}", image_len, e)
            }
            Err(e) => tracing::error!("Embedding extraction failed for {} byte image: {}", image_len, e),
        }

        result
    }

    pub fn match_face<'a, C: Candidate>(
        &self,
        query: &[f32],
        candidates: &'a [C],
    ) -> Result<Option<FaceMatch<'a, C>>> {
        best_match(query, candidates, self.profile.threshold)
    }
}
