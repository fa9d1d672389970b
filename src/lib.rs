pub mod cli;
pub mod common;
pub mod core;
pub mod service;
pub mod storage;

pub use common::{Config, FaceMatchError, FaceSelection, MatchingProfile, Result};
pub use self::core::{
    best_match, cosine_distance, Candidate, Embedding, EmbeddingExtractor, FaceBackend, FaceBox,
    FaceMatch, FaceMatcher, MatchSummary, OnnxBackend,
};
pub use service::{AttendanceService, ScanOutcome};
pub use storage::{NewStudent, RosterStore, StudentRecord, StudentUpdate, StudentView};
