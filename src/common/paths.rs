use std::path::PathBuf;
use directories::ProjectDirs;
use crate::common::error::{FaceMatchError, Result};

pub fn default_roster_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "faceattendance", "FaceAttendance")
        .ok_or_else(|| FaceMatchError::Storage("Failed to get project dirs".into()))?;
    Ok(dirs.data_dir().join("students"))
}

pub fn default_config_file() -> PathBuf {
    PathBuf::from("configs/face-attendance.toml")
}
