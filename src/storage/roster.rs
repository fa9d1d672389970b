use crate::common::{default_roster_dir, FaceMatchError, Result};
use crate::core::matcher::Candidate;
use crate::core::recognizer::Embedding;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const STORAGE_VERSION: u32 = 1;
const RECORD_EXTENSION: &str = "bincode";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Roster fields supplied at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStudent {
    pub student_id: String,
    pub name: String,
    pub branch: String,
    pub year: u32,
    pub section: String,
    pub email: String,
    pub phone: String,
    pub parent_phone: String,
}

impl NewStudent {
    pub fn validate(&self) -> Result<()> {
        validate_student_id(&self.student_id)?;
        if self.name.trim().is_empty() {
            return Err(FaceMatchError::InvalidStudent("name must not be empty".into()));
        }
        validate_email(&self.email)
    }
}

/// A stored roster entry. The embedding is written once at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub version: u32,
    pub student_id: String,
    pub name: String,
    pub branch: String,
    pub year: u32,
    pub section: String,
    pub email: String,
    pub phone: String,
    pub parent_phone: String,
    pub face_embedding: Option<Embedding>,
    pub created_at: DateTime<Utc>,
}

impl StudentRecord {
    pub fn new(student: NewStudent, face_embedding: Option<Embedding>) -> Self {
        Self {
            version: STORAGE_VERSION,
            student_id: student.student_id,
            name: student.name,
            branch: student.branch,
            year: student.year,
            section: student.section,
            email: student.email,
            phone: student.phone,
            parent_phone: student.parent_phone,
            face_embedding,
            created_at: Utc::now(),
        }
    }

    pub fn has_embedding(&self) -> bool {
        self.face_embedding.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// The record as shown to callers, without the embedding.
    pub fn view(&self) -> StudentView {
        StudentView {
            student_id: self.student_id.clone(),
            name: self.name.clone(),
            branch: self.branch.clone(),
            year: self.year,
            section: self.section.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            parent_phone: self.parent_phone.clone(),
            created_at: self.created_at,
        }
    }
}

impl Candidate for StudentRecord {
    fn identifier(&self) -> &str {
        &self.student_id
    }

    fn embedding(&self) -> Option<&[f32]> {
        self.face_embedding.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentView {
    pub student_id: String,
    pub name: String,
    pub branch: String,
    pub year: u32,
    pub section: String,
    pub email: String,
    pub phone: String,
    pub parent_phone: String,
    pub created_at: DateTime<Utc>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub branch: Option<String>,
    pub year: Option<u32>,
    pub section: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub parent_phone: Option<String>,
}

impl StudentUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.branch.is_none()
            && self.year.is_none()
            && self.section.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.parent_phone.is_none()
    }

    fn apply(self, record: &mut StudentRecord) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(branch) = self.branch {
            record.branch = branch;
        }
        if let Some(year) = self.year {
            record.year = year;
        }
        if let Some(section) = self.section {
            record.section = section;
        }
        if let Some(email) = self.email {
            record.email = email;
        }
        if let Some(phone) = self.phone {
            record.phone = phone;
        }
        if let Some(parent_phone) = self.parent_phone {
            record.parent_phone = parent_phone;
        }
    }
}

/// One bincode file per student under a single directory.
pub struct RosterStore {
    data_dir: PathBuf,
}

impl RosterStore {
    pub fn new_with_path(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir)?;
        tracing::debug!("RosterStore using {:?}", data_dir);
        Ok(Self { data_dir })
    }

    pub fn new() -> Result<Self> {
        Self::new_with_path(default_roster_dir()?)
    }

    pub fn contains(&self, student_id: &str) -> Result<bool> {
        Ok(self.record_path(student_id)?.exists())
    }

    /// Stores a new record; fails with `DuplicateStudent` if the id is taken,
    /// including when another registration for the same id wins a race.
    pub fn insert(&self, record: &StudentRecord) -> Result<()> {
        let path = self.record_path(&record.student_id)?;
        let temp = self.write_temp(record)?;

        // hard_link never replaces an existing file
        let linked = fs::hard_link(&temp, &path);
        let _ = fs::remove_file(&temp);
        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(FaceMatchError::DuplicateStudent(record.student_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, student_id: &str) -> Result<StudentRecord> {
        let path = self.record_path(student_id)?;
        if !path.exists() {
            return Err(FaceMatchError::StudentNotFound(student_id.to_string()));
        }
        read_record(&path)
    }

    /// All readable records, oldest registration first.
    ///
    /// A record file that fails to decode is logged and left out, so one bad
    /// file cannot take the whole roster down. `get` still reports it.
    pub fn list(&self) -> Result<Vec<StudentRecord>> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            match read_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => tracing::error!("Skipping unreadable roster record: {}", e),
            }
        }

        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.student_id.cmp(&b.student_id))
        });
        Ok(records)
    }

    /// Records eligible for matching, in [`list`](Self::list) order.
    pub fn candidates(&self) -> Result<Vec<StudentRecord>> {
        Ok(self.list()?.into_iter().filter(StudentRecord::has_embedding).collect())
    }

    pub fn update(&self, student_id: &str, update: StudentUpdate) -> Result<StudentRecord> {
        if update.is_empty() {
            return Err(FaceMatchError::EmptyUpdate);
        }
        if let Some(email) = &update.email {
            validate_email(email)?;
        }

        let mut record = self.get(student_id)?;
        update.apply(&mut record);
        self.replace(&record)?;
        Ok(record)
    }

    pub fn delete(&self, student_id: &str) -> Result<()> {
        let path = self.record_path(student_id)?;
        if !path.exists() {
            return Err(FaceMatchError::StudentNotFound(student_id.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    /// Atomically swaps in a new version of an existing record.
    fn replace(&self, record: &StudentRecord) -> Result<()> {
        let path = self.record_path(&record.student_id)?;
        let temp = self.write_temp(record)?;
        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Writes the fully encoded record to a fresh temp file in the roster dir.
    /// Temp names end in `.tmp`, so `list` never picks them up.
    fn write_temp(&self, record: &StudentRecord) -> Result<PathBuf> {
        let encoded = bincode::serialize(record)
            .map_err(|e| FaceMatchError::Storage(format!("Failed to serialize: {}", e)))?;

        let temp = self.data_dir.join(format!(
            "{}.{}.{}.{}.tmp",
            record.student_id,
            RECORD_EXTENSION,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let written = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp)
            .and_then(|mut file| {
                file.write_all(&encoded)?;
                file.sync_all()
            });
        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(temp)
    }

    fn record_path(&self, student_id: &str) -> Result<PathBuf> {
        validate_student_id(student_id)?;
        Ok(self.data_dir.join(format!("{}.{}", student_id, RECORD_EXTENSION)))
    }
}

fn read_record(path: &Path) -> Result<StudentRecord> {
    let data = fs::read(path)?;
    let record: StudentRecord = bincode::deserialize(&data).map_err(|e| {
        FaceMatchError::Storage(format!("Failed to deserialize {}: {}", path.display(), e))
    })?;

    if record.version != STORAGE_VERSION {
        return Err(FaceMatchError::Storage(format!(
            "{} has record version {}, expected {}",
            path.display(),
            record.version,
            STORAGE_VERSION
        )));
    }

    Ok(record)
}

/// Ids double as file names, so only `[A-Za-z0-9_-]` is accepted.
fn validate_student_id(student_id: &str) -> Result<()> {
    let valid = !student_id.is_empty()
        && student_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(FaceMatchError::InvalidStudent(format!(
            "student id {:?} must be non-empty and use only letters, digits, '-' or '_'",
            student_id
        )))
    }
}

fn validate_email(email: &str) -> Result<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(FaceMatchError::InvalidStudent(format!("invalid email address: {:?}", email))),
    }
}
