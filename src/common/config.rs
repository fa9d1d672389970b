use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::common::error::{FaceMatchError, Result};
use crate::common::paths::default_config_file;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub models: ModelConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
    #[serde(default)]
    pub matching: MatchingProfile,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    /// Directory the config was loaded from; relative model paths resolve against it.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelConfig {
    pub detector_path: PathBuf,
    pub recognizer_path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectorConfig {
    #[serde(default = "default_detector_input")]
    pub input_width: u32,
    #[serde(default = "default_detector_input")]
    pub input_height: u32,
    #[serde(default = "default_detection_confidence")]
    pub confidence: f32,
    #[serde(default = "default_nms_iou")]
    pub nms_iou: f32,
    #[serde(default = "default_max_faces")]
    pub max_faces: usize,
    #[serde(default)]
    pub face_selection: FaceSelection,
    #[serde(default)]
    pub output_layout: OutputLayout,
}

fn default_detector_input() -> u32 { 640 }
fn default_detection_confidence() -> f32 { 0.5 }
fn default_nms_iou() -> f32 { 0.45 }
fn default_max_faces() -> usize { 5 }

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_width: default_detector_input(),
            input_height: default_detector_input(),
            confidence: default_detection_confidence(),
            nms_iou: default_nms_iou(),
            max_faces: default_max_faces(),
            face_selection: FaceSelection::default(),
            output_layout: OutputLayout::default(),
        }
    }
}

/// Which detection feeds the embedding model when an image holds several faces.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FaceSelection {
    /// Whatever the detector reports first.
    #[default]
    First,
    /// The detection with the largest box area.
    Largest,
}

/// How a 3-D detector output `[1, a, b]` is laid out.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// Guess from the shape; only `[1, <=20, >20]` is read as transposed.
    #[default]
    Auto,
    /// `[1, predictions, fields]`
    RowMajor,
    /// `[1, fields, predictions]`, as exported by YOLOv8.
    Transposed,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecognizerConfig {
    #[serde(default = "default_recognizer_input")]
    pub input_size: u32,
    #[serde(default)]
    pub layout: TensorLayout,
    #[serde(default)]
    pub normalization: Normalization,
}

fn default_recognizer_input() -> u32 { 160 }

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            input_size: default_recognizer_input(),
            layout: TensorLayout::default(),
            normalization: Normalization::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TensorLayout {
    /// `[1, H, W, 3]`, the layout of Keras-exported FaceNet models.
    #[default]
    Nhwc,
    /// `[1, 3, H, W]`
    Nchw,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Normalization {
    /// Per-image zero mean, unit variance.
    #[default]
    Standardize,
    /// `(pixel - value) / value`, e.g. 127.5 for ArcFace exports.
    Centered { value: f32 },
}

/// The acceptance threshold only means something for the model that
/// produced the embeddings, so the two are configured together.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MatchingProfile {
    pub model_name: String,
    pub embedding_dim: usize,
    /// Maximum cosine distance (exclusive) for a candidate to count as a match.
    pub threshold: f32,
}

impl MatchingProfile {
    pub fn facenet512() -> Self {
        Self {
            model_name: "Facenet512".to_string(),
            embedding_dim: 512,
            threshold: 0.4,
        }
    }
}

impl Default for MatchingProfile {
    fn default() -> Self {
        Self::facenet512()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WorkerConfig {
    #[serde(default = "default_worker_threads")]
    pub threads: usize,
    #[serde(default = "default_inference_timeout")]
    pub inference_timeout_ms: u64,
}

fn default_worker_threads() -> usize { 2 }
fn default_inference_timeout() -> u64 { 10_000 }

impl WorkerConfig {
    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: default_worker_threads(),
            inference_timeout_ms: default_inference_timeout(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// Falls back to the platform data directory when unset.
    #[serde(default)]
    pub roster_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PerformanceConfig {
    #[serde(default = "default_optimization_level")]
    pub optimization_level: u32,
}

fn default_optimization_level() -> u32 { 3 }

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self { optimization_level: default_optimization_level() }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from_path(&default_config_file())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FaceMatchError::Other(anyhow::anyhow!(
                "Config file not found: {}. Please create it from the example.", path.display()
            )));
        }

        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&contents)?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| FaceMatchError::Other(anyhow::anyhow!("Config parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn resolve_model_path(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.base_dir.join(path)
        } else {
            path.to_path_buf()
        }
    }

    pub fn validate(&self) -> Result<()> {
        // Cosine distance lives in [0, 2]
        if !(self.matching.threshold > 0.0 && self.matching.threshold <= 2.0) {
            return Err(FaceMatchError::Other(anyhow::anyhow!(
                "Matching threshold must be in (0.0, 2.0], got {}", self.matching.threshold
            )));
        }
        if self.matching.embedding_dim == 0 {
            return Err(FaceMatchError::Other(anyhow::anyhow!(
                "Embedding dimension for model {} must be positive", self.matching.model_name
            )));
        }

        if self.detector.confidence < 0.0 || self.detector.confidence > 1.0 {
            return Err(FaceMatchError::Other(anyhow::anyhow!(
                "Detection confidence must be between 0.0 and 1.0, got {}",
                self.detector.confidence
            )));
        }
        if self.detector.input_width == 0 || self.detector.input_width > 4096 {
            return Err(FaceMatchError::Other(anyhow::anyhow!(
                "Detector input width must be between 1 and 4096, got {}",
                self.detector.input_width
            )));
        }
        if self.detector.input_height == 0 || self.detector.input_height > 4096 {
            return Err(FaceMatchError::Other(anyhow::anyhow!(
                "Detector input height must be between 1 and 4096, got {}",
                self.detector.input_height
            )));
        }
        if self.detector.max_faces == 0 {
            return Err(FaceMatchError::Other(anyhow::anyhow!(
                "Detector must keep at least one face"
            )));
        }

        if self.recognizer.input_size == 0 || self.recognizer.input_size > 1024 {
            return Err(FaceMatchError::Other(anyhow::anyhow!(
                "Recognizer input size must be between 1 and 1024, got {}",
                self.recognizer.input_size
            )));
        }
        if let Normalization::Centered { value } = self.recognizer.normalization {
            if value <= 0.0 {
                return Err(FaceMatchError::Other(anyhow::anyhow!(
                    "Centered normalization value must be positive, got {}", value
                )));
            }
        }

        if self.worker.threads == 0 {
            return Err(FaceMatchError::Other(anyhow::anyhow!(
                "Worker pool needs at least one thread"
            )));
        }
        if self.worker.inference_timeout_ms == 0 {
            return Err(FaceMatchError::Other(anyhow::anyhow!(
                "Inference timeout must be at least 1 ms"
            )));
        }

        Ok(())
    }
}
