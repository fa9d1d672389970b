use face_attendance::{
    cli::draw_detections,
    common::Config,
    core::{select_face, FaceBackend, FaceMatcher, OnnxBackend},
    service::AttendanceService,
    storage::{NewStudent, RosterStore, StudentUpdate},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "face-attendance")]
#[command(about = "Student roster with face-recognition attendance")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the roster directory from the config
    #[arg(long, global = true)]
    roster_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a student from a face photo
    Register {
        #[command(flatten)]
        student: StudentArgs,
        /// Photo containing the student's face
        #[arg(short, long)]
        image: PathBuf,
    },
    /// Identify the student in a photo
    Scan {
        #[arg(short, long)]
        image: PathBuf,
    },
    /// List registered students
    List,
    /// Update roster fields of a student
    Update {
        student_id: String,
        #[command(flatten)]
        update: UpdateArgs,
    },
    /// Remove a student from the roster
    Delete { student_id: String },
    /// Run face detection and save an annotated copy of the image
    Detect {
        #[arg(short, long)]
        image: PathBuf,
        #[arg(short, long, default_value = "detections.png")]
        output: PathBuf,
    },
}

#[derive(Args)]
struct StudentArgs {
    #[arg(long)]
    student_id: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    branch: String,
    #[arg(long)]
    year: u32,
    #[arg(long)]
    section: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    parent_phone: String,
}

impl From<StudentArgs> for NewStudent {
    fn from(args: StudentArgs) -> Self {
        NewStudent {
            student_id: args.student_id,
            name: args.name,
            branch: args.branch,
            year: args.year,
            section: args.section,
            email: args.email,
            phone: args.phone,
            parent_phone: args.parent_phone,
        }
    }
}

#[derive(Args)]
struct UpdateArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    branch: Option<String>,
    #[arg(long)]
    year: Option<u32>,
    #[arg(long)]
    section: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    parent_phone: Option<String>,
}

impl From<UpdateArgs> for StudentUpdate {
    fn from(args: UpdateArgs) -> Self {
        StudentUpdate {
            name: args.name,
            branch: args.branch,
            year: args.year,
            section: args.section,
            email: args.email,
            phone: args.phone,
            parent_phone: args.parent_phone,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    let roster_dir = cli.roster_dir.or_else(|| config.storage.roster_dir.clone());
    let store = match roster_dir {
        Some(dir) => RosterStore::new_with_path(dir)?,
        None => RosterStore::new()?,
    };

    match cli.command {
        Commands::Register { student, image } => {
            let matcher = FaceMatcher::from_config(&config)?;
            let service = AttendanceService::new(&matcher, &store);
            let bytes = read_image(&image)?;
            let registered = service
                .register_student(student.into(), bytes)
                .map_err(no_face_context)?;
            print_json(&registered)?;
        }
        Commands::Scan { image } => {
            let matcher = FaceMatcher::from_config(&config)?;
            let service = AttendanceService::new(&matcher, &store);
            let bytes = read_image(&image)?;
            let outcome = service.scan_face(bytes).map_err(no_face_context)?;
            print_json(&outcome)?;
        }
        Commands::List => {
            let students = store.list()?;
            let views: Vec<_> = students.iter().map(|s| s.view()).collect();
            print_json(&views)?;
        }
        Commands::Update { student_id, update } => {
            let record = store.update(&student_id, update.into())?;
            tracing::info!("Updated student {}", student_id);
            print_json(&record.view())?;
        }
        Commands::Delete { student_id } => {
            store.delete(&student_id)?;
            println!("Student {} deleted", student_id);
        }
        Commands::Detect { image, output } => {
            let backend = OnnxBackend::new(&config)?;
            let decoded = image::open(&image)
                .with_context(|| format!("Failed to open {}", image.display()))?;
            let faces = backend.detect(&decoded)?;
            let selected = select_face(&faces, config.detector.face_selection);

            for (i, face) in faces.iter().enumerate() {
                println!(
                    "face {}: ({:.0}, {:.0})-({:.0}, {:.0}) confidence {:.3}{}",
                    i,
                    face.x1,
                    face.y1,
                    face.x2,
                    face.y2,
                    face.confidence,
                    if selected.is_some_and(|s| std::ptr::eq(s, face)) { " [selected]" } else { "" }
                );
            }
            if faces.is_empty() {
                println!("No faces detected");
            }

            draw_detections(&decoded, &faces, selected)
                .save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Saved annotated image to {}", output.display());
        }
    }

    Ok(())
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))
}

fn no_face_context(e: face_attendance::FaceMatchError) -> anyhow::Error {
    if e.is_no_usable_face() {
        anyhow::anyhow!("No face detected in the image ({})", e)
    } else {
        e.into()
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn setup_logging(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .init();
    }
}
