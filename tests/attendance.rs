mod common;

use common::{png, test_config, ColorBackend};
use face_attendance::{
    AttendanceService, FaceMatchError, FaceMatcher, NewStudent, RosterStore, StudentRecord,
};
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _tmp: TempDir,
    backend: Arc<ColorBackend>,
    matcher: FaceMatcher,
    store: RosterStore,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(ColorBackend::default());
        let matcher = FaceMatcher::new(backend.clone(), &test_config()).unwrap();
        let store = RosterStore::new_with_path(tmp.path().join("students")).unwrap();
        Self { _tmp: tmp, backend, matcher, store }
    }

    fn service(&self) -> AttendanceService<'_> {
        AttendanceService::new(&self.matcher, &self.store)
    }
}

fn student(id: &str, name: &str) -> NewStudent {
    NewStudent {
        student_id: id.to_string(),
        name: name.to_string(),
        branch: "ECE".to_string(),
        year: 3,
        section: "A".to_string(),
        email: format!("{}@college.example", id.to_lowercase()),
        phone: "555-0142".to_string(),
        parent_phone: "555-0143".to_string(),
    }
}

#[test]
fn registered_student_is_recognized() {
    let fx = Fixture::new();
    let service = fx.service();
    service.register_student(student("EC-101", "Meera"), png([200, 40, 40])).unwrap();
    service.register_student(student("EC-102", "Tomas"), png([40, 200, 40])).unwrap();

    let outcome = service.scan_face(png([40, 200, 40])).unwrap();
    assert!(outcome.matched);
    assert_eq!(outcome.student.as_ref().unwrap().student_id, "EC-102");
    let distance = outcome.distance.unwrap();
    assert!(distance.abs() < 1e-5);
    assert_eq!(outcome.confidence, Some(1.0 - distance));
}

#[test]
fn unknown_face_is_not_matched() {
    let fx = Fixture::new();
    let service = fx.service();
    service.register_student(student("EC-101", "Meera"), png([255, 1, 1])).unwrap();

    let outcome = service.scan_face(png([1, 1, 255])).unwrap();
    assert!(!outcome.matched);
    assert!(outcome.student.is_none());
    assert!(outcome.confidence.is_none());
}

#[test]
fn scan_against_empty_roster_is_no_match() {
    let fx = Fixture::new();
    let outcome = fx.service().scan_face(png([90, 90, 90])).unwrap();
    assert!(!outcome.matched);
    assert_eq!(serde_json::to_string(&outcome).unwrap(), r#"{"matched":false}"#);
}

#[test]
fn registration_without_face_is_rejected_and_not_stored() {
    let fx = Fixture::new();
    let err = fx
        .service()
        .register_student(student("EC-103", "Ira"), png([0, 0, 0]))
        .unwrap_err();
    assert!(err.is_no_usable_face());
    assert!(!fx.store.contains("EC-103").unwrap());
}

#[test]
fn duplicate_registration_is_rejected_before_inference() {
    let fx = Fixture::new();
    let service = fx.service();
    service.register_student(student("EC-104", "Lena"), png([10, 120, 30])).unwrap();
    assert_eq!(fx.backend.calls(), 1);

    let err = service
        .register_student(student("EC-104", "Lena"), png([10, 120, 30]))
        .unwrap_err();
    assert!(matches!(err, FaceMatchError::DuplicateStudent(_)));
    assert_eq!(fx.backend.calls(), 1);
}

#[test]
fn scan_result_never_exposes_embedding() {
    let fx = Fixture::new();
    let service = fx.service();
    service.register_student(student("EC-105", "Omar"), png([70, 70, 200])).unwrap();

    let outcome = service.scan_face(png([70, 70, 200])).unwrap();
    let json = serde_json::to_string(&outcome).unwrap();
    assert!(json.contains("\"student_id\":\"EC-105\""));
    assert!(!json.contains("embedding"));
}

#[test]
fn corrupted_stored_embedding_fails_the_scan() {
    let fx = Fixture::new();
    let corrupt = StudentRecord::new(student("EC-106", "Zoe"), Some(vec![1.0, 2.0, 3.0]));
    fx.store.insert(&corrupt).unwrap();

    let err = fx.service().scan_face(png([70, 70, 200])).unwrap_err();
    assert!(matches!(err, FaceMatchError::DimensionMismatch { expected: 512, actual: 3 }));
}

#[test]
fn students_without_embedding_are_ignored_by_scans() {
    let fx = Fixture::new();
    fx.store
        .insert(&StudentRecord::new(student("EC-107", "Kai"), None))
        .unwrap();

    let outcome = fx.service().scan_face(png([70, 70, 200])).unwrap();
    assert!(!outcome.matched);
}

#[test]
fn invalid_student_fields_are_rejected_before_inference() {
    let fx = Fixture::new();
    let mut bad = student("EC-108", "Noor");
    bad.email = "noor-at-college".to_string();

    let err = fx.service().register_student(bad, png([70, 70, 200])).unwrap_err();
    assert!(matches!(err, FaceMatchError::InvalidStudent(_)));
    assert_eq!(fx.backend.calls(), 0);
}
