pub mod config;
pub mod error;
pub mod paths;

pub use config::{
    Config, FaceSelection, MatchingProfile, Normalization, OutputLayout, TensorLayout,
    WorkerConfig,
};
pub use error::{FaceMatchError, Result};
pub use paths::{default_config_file, default_roster_dir};
