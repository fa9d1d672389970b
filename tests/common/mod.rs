#![allow(dead_code)]

use face_attendance::{Config, Embedding, FaceBackend, FaceBox, Result};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const DIM: usize = 512;

/// Stand-in for the ONNX models.
///
/// A black top-left pixel means "no face"; otherwise one face covers the
/// whole image and its embedding repeats the image's (r, g, b) + 1 pattern,
/// so same-colored photos embed identically and different colors diverge.
#[derive(Default)]
pub struct ColorBackend {
    pub dim: Option<usize>,
    pub delay: Option<Duration>,
    pub detect_calls: AtomicUsize,
}

impl ColorBackend {
    pub fn calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }
}

impl FaceBackend for ColorBackend {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceBox>> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let rgb = image.to_rgb8();
        if *rgb.get_pixel(0, 0) == Rgb([0, 0, 0]) {
            return Ok(Vec::new());
        }
        Ok(vec![FaceBox {
            x1: 0.0,
            y1: 0.0,
            x2: image.width() as f32,
            y2: image.height() as f32,
            confidence: 0.99,
        }])
    }

    fn embed(&self, image: &DynamicImage, _face: &FaceBox) -> Result<Embedding> {
        let pixel = *image.to_rgb8().get_pixel(0, 0);
        let dim = self.dim.unwrap_or(DIM);
        Ok((0..dim).map(|i| pixel[i % 3] as f32 + 1.0).collect())
    }
}

pub fn png(color: [u8; 3]) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb(color)));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .unwrap();
    bytes
}

pub fn test_config() -> Config {
    Config::from_toml(
        r#"
        [models]
        detector_path = "unused-detector.onnx"
        recognizer_path = "unused-recognizer.onnx"

        [worker]
        threads = 2
        inference_timeout_ms = 2000
        "#,
    )
    .unwrap()
}
