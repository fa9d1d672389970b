use crate::common::{config::DetectorConfig, Config, FaceMatchError, OutputLayout, Result};
use crate::core::session::build_session;
use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array4, CowArray};
use ort::{Environment, Session, Value};
use std::sync::Arc;

/// Boxes narrower or shorter than this (in detector input pixels) are noise.
const MIN_BOX_SIZE: f32 = 10.0;

/// Widest prediction row `OutputLayout::Auto` will accept as a transposed field axis.
const MAX_AUTO_FIELDS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct FaceBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
}

impl FaceBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn iou(&self, other: &FaceBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }

    fn scale(&mut self, scale_x: f32, scale_y: f32) {
        self.x1 *= scale_x;
        self.x2 *= scale_x;
        self.y1 *= scale_y;
        self.y2 *= scale_y;
    }
}

/// YOLOv8-face style detector.
pub struct FaceDetector {
    session: Session,
    _environment: Arc<Environment>,
    config: DetectorConfig,
}

impl FaceDetector {
    pub fn new(config: &Config) -> Result<Self> {
        let (environment, session) =
            build_session(config, "face_detector", &config.models.detector_path)?;

        Ok(Self {
            session,
            _environment: environment,
            config: config.detector.clone(),
        })
    }

    /// Detected faces in the coordinate space of `image`, most confident first.
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceBox>> {
        let orig_width = image.width() as f32;
        let orig_height = image.height() as f32;

        let img_array = if image.width() == self.config.input_width
            && image.height() == self.config.input_height
        {
            image_to_array(image)
        } else {
            let resized = image.resize_exact(
                self.config.input_width,
                self.config.input_height,
                FilterType::Triangle,
            );
            image_to_array(&resized)
        };

        let cow_array = CowArray::from(img_array.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let output = outputs
            .first()
            .ok_or_else(|| FaceMatchError::Model("Detector produced no outputs".into()))?
            .try_extract::<f32>()?
            .view()
            .to_owned();
        let shape = output.shape().to_vec();
        let data: Vec<f32> = output.iter().copied().collect();

        let mut faces = decode_predictions(&shape, &data, &self.config)?;

        let scale_x = orig_width / self.config.input_width as f32;
        let scale_y = orig_height / self.config.input_height as f32;
        for face in &mut faces {
            face.scale(scale_x, scale_y);
        }

        Ok(faces)
    }
}

fn image_to_array(img: &DynamicImage) -> Array4<f32> {
    let rgb = img.to_rgb8();
    let width = rgb.width() as usize;
    let height = rgb.height() as usize;
    let mut array = Array4::<f32>::zeros((1, 3, height, width));

    let norm_factor = 1.0 / 255.0;
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        array[[0, 0, y, x]] = pixel[0] as f32 * norm_factor;
        array[[0, 1, y, x]] = pixel[1] as f32 * norm_factor;
        array[[0, 2, y, x]] = pixel[2] as f32 * norm_factor;
    }

    array
}

/// Turns a raw YOLO output tensor into filtered face boxes in detector input space.
///
/// Accepts `[1, N, 5+]`, the transposed `[1, 5+, N]` export, and `[N, 5+]`.
/// 3-D outputs follow `config.output_layout`. Each prediction is `[x_center, y_center, width, height, confidence, ...]`,
/// either in pixels or normalized to `[0, 1]`.
pub(crate) fn decode_predictions(
    shape: &[usize],
    data: &[f32],
    config: &DetectorConfig,
) -> Result<Vec<FaceBox>> {
    let (num_predictions, prediction_length, is_transposed) = match shape {
        [_, a, b] => {
            let transposed = match config.output_layout {
                OutputLayout::RowMajor => false,
                OutputLayout::Transposed => true,
                OutputLayout::Auto => a < b && *a <= MAX_AUTO_FIELDS && *b > MAX_AUTO_FIELDS,
            };
            if transposed {
                (*b, *a, true)
            } else {
                (*a, *b, false)
            }
        }
        [a, b] => (*a, *b, false),
        _ => {
            return Err(FaceMatchError::Model(format!(
                "Unexpected detector output shape: {:?}",
                shape
            )))
        }
    };

    if prediction_length < 5 || data.len() < num_predictions * prediction_length {
        return Err(FaceMatchError::Model(format!(
            "Detector output shape {:?} does not match {} values",
            shape,
            data.len()
        )));
    }

    let value = |i: usize, field: usize| {
        if is_transposed {
            data[field * num_predictions + i]
        } else {
            data[i * prediction_length + field]
        }
    };

    let input_width = config.input_width as f32;
    let input_height = config.input_height as f32;
    let mut faces = Vec::new();

    for i in 0..num_predictions {
        let confidence = value(i, 4);
        if confidence < config.confidence {
            continue;
        }

        let (mut cx, mut cy, mut w, mut h) = (value(i, 0), value(i, 1), value(i, 2), value(i, 3));
        if cx <= 1.0 && cy <= 1.0 && w <= 1.0 && h <= 1.0 {
            cx *= input_width;
            w *= input_width;
            cy *= input_height;
            h *= input_height;
        }

        let x1 = (cx - w / 2.0).max(0.0);
        let y1 = (cy - h / 2.0).max(0.0);
        let x2 = (cx + w / 2.0).min(input_width);
        let y2 = (cy + h / 2.0).min(input_height);

        if x2 - x1 > MIN_BOX_SIZE && y2 - y1 > MIN_BOX_SIZE {
            faces.push(FaceBox { x1, y1, x2, y2, confidence });
        }
    }

    let mut faces = apply_nms(faces, config.nms_iou);
    faces.truncate(config.max_faces);
    Ok(faces)
}

/// Greedy non-maximum suppression; output is sorted by descending confidence.
pub(crate) fn apply_nms(mut boxes: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<FaceBox> = Vec::new();
    for candidate in boxes {
        if keep.iter().all(|kept| kept.iou(&candidate) < iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}
