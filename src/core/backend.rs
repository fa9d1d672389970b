use crate::common::{Config, Result};
use crate::core::detector::{FaceBox, FaceDetector};
use crate::core::recognizer::{Embedding, FaceRecognizer};
use image::DynamicImage;

/// The two model calls the extraction pipeline needs.
///
/// Implementations are shared between inference worker threads.
pub trait FaceBackend: Send + Sync {
    /// Faces found in `image`, in the order the detector reports them.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceBox>>;

    /// Embedding of the region `face` of `image`.
    fn embed(&self, image: &DynamicImage, face: &FaceBox) -> Result<Embedding>;
}

/// ONNX Runtime detector + recognizer pair, loaded once at startup.
pub struct OnnxBackend {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxBackend {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            detector: FaceDetector::new(config)?,
            recognizer: FaceRecognizer::new(config)?,
        })
    }
}

impl FaceBackend for OnnxBackend {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceBox>> {
        self.detector.detect(image)
    }

    fn embed(&self, image: &DynamicImage, face: &FaceBox) -> Result<Embedding> {
        self.recognizer.get_embedding(image, face)
    }
}
