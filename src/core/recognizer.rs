use crate::common::{config::RecognizerConfig, Config, FaceMatchError, Normalization, Result, TensorLayout};
use crate::core::detector::FaceBox;
use crate::core::session::build_session;
use image::{imageops::FilterType, DynamicImage, RgbImage};
use ndarray::{Array4, CowArray};
use ort::{Environment, Session, Value};
use std::sync::Arc;

pub type Embedding = Vec<f32>;

pub struct FaceRecognizer {
    session: Session,
    _environment: Arc<Environment>,
    config: RecognizerConfig,
}

impl FaceRecognizer {
    pub fn new(config: &Config) -> Result<Self> {
        let (environment, session) =
            build_session(config, "face_recognizer", &config.models.recognizer_path)?;

        Ok(Self {
            session,
            _environment: environment,
            config: config.recognizer.clone(),
        })
    }

    pub fn get_embedding(&self, image: &DynamicImage, face: &FaceBox) -> Result<Embedding> {
        let face_img = crop_face(image, face)?;
        let size = self.config.input_size;
        let resized = face_img.resize_exact(size, size, FilterType::Triangle).to_rgb8();

        let input_array = preprocess_face(&resized, &self.config);
        let cow_array = CowArray::from(input_array.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;

        let embedding = outputs
            .first()
            .ok_or_else(|| FaceMatchError::Model("Recognizer produced no outputs".into()))?
            .try_extract::<f32>()?
            .view()
            .iter()
            .copied()
            .collect();
        Ok(embedding)
    }
}

/// Crops `face` out of `image`, clamped to the image bounds.
pub(crate) fn crop_face(image: &DynamicImage, face: &FaceBox) -> Result<DynamicImage> {
    let x = (face.x1.max(0.0) as u32).min(image.width().saturating_sub(1));
    let y = (face.y1.max(0.0) as u32).min(image.height().saturating_sub(1));
    let width = (face.width().max(1.0) as u32).min(image.width() - x);
    let height = (face.height().max(1.0) as u32).min(image.height() - y);

    if width == 0 || height == 0 {
        return Err(FaceMatchError::Model(format!(
            "Face box {:?} lies outside a {}x{} image",
            face,
            image.width(),
            image.height()
        )));
    }

    Ok(image.crop_imm(x, y, width, height))
}

pub(crate) fn preprocess_face(img: &RgbImage, config: &RecognizerConfig) -> Array4<f32> {
    let size = img.width() as usize;
    let shape = match config.layout {
        TensorLayout::Nhwc => (1, size, size, 3),
        TensorLayout::Nchw => (1, 3, size, size),
    };
    let mut array = Array4::<f32>::zeros(shape);

    let (offset, scale) = match config.normalization {
        Normalization::Centered { value } => (value, value),
        Normalization::Standardize => {
            let count = (img.as_raw().len()) as f32;
            let mean = img.as_raw().iter().map(|&v| v as f32).sum::<f32>() / count;
            let variance = img
                .as_raw()
                .iter()
                .map(|&v| (v as f32 - mean).powi(2))
                .sum::<f32>()
                / count;
            // Same floor as FaceNet's prewhiten, so flat images don't divide by zero
            let std = variance.sqrt().max(1.0 / count.sqrt());
            (mean, std)
        }
    };

    for (x, y, pixel) in img.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            let value = (pixel[c] as f32 - offset) / scale;
            match config.layout {
                TensorLayout::Nhwc => array[[0, y, x, c]] = value,
                TensorLayout::Nchw => array[[0, c, y, x]] = value,
            }
        }
    }

    array
}
