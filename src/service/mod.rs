pub mod attendance;

pub use attendance::{AttendanceService, ScanOutcome};
