pub mod backend;
pub mod detector;
pub mod extractor;
pub mod face_matcher;
pub mod matcher;
pub mod recognizer;
pub mod worker;
mod session;

pub use backend::{FaceBackend, OnnxBackend};
pub use detector::{FaceBox, FaceDetector};
pub use extractor::{select_face, EmbeddingExtractor};
pub use face_matcher::FaceMatcher;
pub use matcher::{best_match, cosine_distance, cosine_similarity, Candidate, FaceMatch, MatchSummary};
pub use recognizer::{Embedding, FaceRecognizer};
pub use worker::InferencePool;
