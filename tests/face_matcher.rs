mod common;

use common::{png, test_config, ColorBackend, DIM};
use face_attendance::{best_match, Candidate, FaceMatchError, FaceMatcher};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct Enrolled {
    id: &'static str,
    embedding: Option<Vec<f32>>,
}

impl Candidate for Enrolled {
    fn identifier(&self) -> &str {
        self.id
    }

    fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }
}

/// Unit vector at cosine distance `distance` from `[1, 0]`.
fn at_distance(distance: f32) -> Vec<f32> {
    let cos = 1.0 - distance;
    vec![cos, (1.0 - cos * cos).sqrt()]
}

fn enrolled(id: &'static str, embedding: Option<Vec<f32>>) -> Enrolled {
    Enrolled { id, embedding }
}

fn matcher() -> FaceMatcher {
    FaceMatcher::new(Arc::new(ColorBackend::default()), &test_config()).unwrap()
}

#[test]
fn image_without_face_never_yields_embedding() {
    let err = matcher().extract_embedding(png([0, 0, 0])).unwrap_err();
    assert!(matches!(err, FaceMatchError::NoFaceDetected));
    assert!(err.is_no_usable_face());
}

#[test]
fn undecodable_bytes_are_a_decode_error() {
    let err = matcher()
        .extract_embedding(b"definitely not a png".to_vec())
        .unwrap_err();
    assert!(matches!(err, FaceMatchError::Decode(_)));
    assert!(err.is_no_usable_face());
}

#[test]
fn extraction_is_deterministic() {
    let matcher = matcher();
    let bytes = png([120, 80, 40]);
    let first = matcher.extract_embedding(bytes.clone()).unwrap();
    let second = matcher.extract_embedding(bytes).unwrap();
    assert_eq!(first.len(), DIM);
    assert_eq!(first, second);
}

#[test]
fn wrong_embedding_length_from_model_is_a_model_error() {
    let backend = ColorBackend { dim: Some(128), ..Default::default() };
    let matcher = FaceMatcher::new(Arc::new(backend), &test_config()).unwrap();
    let err = matcher.extract_embedding(png([10, 20, 30])).unwrap_err();
    assert!(matches!(err, FaceMatchError::Model(_)));
    assert!(!err.is_no_usable_face());
}

#[test]
fn slow_inference_times_out() {
    let mut config = test_config();
    config.worker.inference_timeout_ms = 20;
    let backend = ColorBackend { delay: Some(Duration::from_millis(300)), ..Default::default() };
    let matcher = FaceMatcher::new(Arc::new(backend), &config).unwrap();

    let err = matcher.extract_embedding(png([10, 20, 30])).unwrap_err();
    assert!(matches!(err, FaceMatchError::InferenceTimeout(_)));
}

#[test]
fn first_occurrence_of_minimum_wins() {
    let candidates = vec![
        enrolled("a", Some(at_distance(0.5))),
        enrolled("b", Some(at_distance(0.3))),
        enrolled("c", Some(at_distance(0.3))),
        enrolled("d", Some(at_distance(0.6))),
    ];
    let found = matcher().match_face(&[1.0, 0.0], &candidates).unwrap().unwrap();
    assert_eq!(found.candidate.identifier(), "b");
    assert!((found.distance - 0.3).abs() < 1e-5);
}

#[test]
fn threshold_is_exclusive() {
    let query = [1.0, 0.0];
    let candidates = vec![enrolled("edge", Some(at_distance(0.4)))];
    let exact = face_attendance::cosine_distance(&query, candidates[0].embedding().unwrap()).unwrap();

    assert!(best_match(&query, &candidates, exact).unwrap().is_none());
    assert!(best_match(&query, &candidates, exact + 1e-4).unwrap().is_some());
}

#[test]
fn never_returns_candidate_at_or_over_threshold() {
    let candidates = vec![
        enrolled("far", Some(at_distance(0.9))),
        enrolled("opposite", Some(vec![-1.0, 0.0])),
        enrolled("orthogonal", Some(vec![0.0, 1.0])),
    ];
    assert!(matcher().match_face(&[1.0, 0.0], &candidates).unwrap().is_none());
}

#[test]
fn empty_candidate_list_is_no_match() {
    let candidates: Vec<Enrolled> = Vec::new();
    assert!(matcher().match_face(&[1.0, 0.0], &candidates).unwrap().is_none());
}

#[test]
fn candidates_without_embeddings_are_skipped_without_error() {
    let candidates = vec![enrolled("a", None), enrolled("b", Some(Vec::new()))];
    assert!(matcher().match_face(&[1.0, 0.0], &candidates).unwrap().is_none());
}

#[test]
fn unenrolled_candidates_do_not_hide_a_later_match() {
    let candidates = vec![enrolled("a", None), enrolled("b", Some(at_distance(0.1)))];
    let found = matcher().match_face(&[1.0, 0.0], &candidates).unwrap().unwrap();
    assert_eq!(found.candidate.identifier(), "b");
}

#[test]
fn dimension_mismatch_fails_loudly() {
    let candidates = vec![
        enrolled("good", Some(at_distance(0.1))),
        enrolled("corrupt", Some(vec![1.0, 0.0, 0.0])),
    ];
    let err = matcher().match_face(&[1.0, 0.0], &candidates).unwrap_err();
    assert!(matches!(err, FaceMatchError::DimensionMismatch { expected: 2, actual: 3 }));
}

#[test]
fn confidence_is_one_minus_distance() {
    let candidates = vec![enrolled("a", Some(at_distance(0.25)))];
    let found = matcher().match_face(&[1.0, 0.0], &candidates).unwrap().unwrap();
    assert_eq!(found.confidence(), 1.0 - found.distance);
}

#[test]
fn matcher_uses_profile_threshold() {
    let mut config = test_config();
    config.matching.threshold = 0.2;
    let matcher = FaceMatcher::new(Arc::new(ColorBackend::default()), &config).unwrap();
    let candidates = vec![enrolled("a", Some(at_distance(0.3)))];
    assert!(matcher.match_face(&[1.0, 0.0], &candidates).unwrap().is_none());
}
