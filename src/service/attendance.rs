use crate::common::{FaceMatchError, Result};
use crate::core::face_matcher::FaceMatcher;
use crate::storage::{NewStudent, RosterStore, StudentRecord, StudentView};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
    /// `1 - distance`, only present on a match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl ScanOutcome {
    fn no_match() -> Self {
        Self { matched: false, student: None, distance: None, confidence: None }
    }
}

/// Registration and attendance scans over the roster.
pub struct AttendanceService<'a> {
    matcher: &'a FaceMatcher,
    store: &'a RosterStore,
}

impl<'a> AttendanceService<'a> {
    pub fn new(matcher: &'a FaceMatcher, store: &'a RosterStore) -> Self {
        Self { matcher, store }
    }

    /// Enrolls a student with the embedding of the face in `image_bytes`.
    ///
    /// The id is checked before any inference runs. An image without a usable
    /// face rejects the registration.
    pub fn register_student(&self, student: NewStudent, image_bytes: Vec<u8>) -> Result<StudentView> {
        student.validate()?;
        if self.store.contains(&student.student_id)? {
            return Err(FaceMatchError::DuplicateStudent(student.student_id));
        }

        let embedding = self.matcher.extract_embedding(image_bytes)?;
        let record = StudentRecord::new(student, Some(embedding));
        self.store.insert(&record)?;

        tracing::info!("Registered student {} ({})", record.student_id, record.name);
        Ok(record.view())
    }

    pub fn scan_face(&self, image_bytes: Vec<u8>) -> Result<ScanOutcome> {
        let embedding = self.matcher.extract_embedding(image_bytes)?;
        let candidates = self.store.candidates()?;

        let outcome = match self.matcher.match_face(&embedding, &candidates)? {
            Some(found) => {
                tracing::info!(
                    "Scan matched {} at distance {:.4}",
                    found.candidate.student_id,
                    found.distance
                );
                ScanOutcome {
                    matched: true,
                    student: Some(found.candidate.view()),
                    distance: Some(found.distance),
                    confidence: Some(found.confidence()),
                }
            }
            None => {
                tracing::info!("Scan found no match among {} candidates", candidates.len());
                ScanOutcome::no_match()
            }
        };

        Ok(outcome)
    }
}
