pub mod roster;

pub use roster::{NewStudent, RosterStore, StudentRecord, StudentUpdate, StudentView};
