use crate::core::FaceBox;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

const SELECTED_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const OTHER_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// Copy of `image` with every detection outlined; the selected face gets a
/// thicker green box, the rest thin yellow ones.
pub fn draw_detections(image: &DynamicImage, faces: &[FaceBox], selected: Option<&FaceBox>) -> RgbImage {
    let mut img = image.to_rgb8();

    for face in faces {
        let is_selected = selected.is_some_and(|s| std::ptr::eq(s, face));
        let (color, thickness) = if is_selected { (SELECTED_COLOR, 3) } else { (OTHER_COLOR, 1) };

        for inset in 0..thickness {
            if let Some(rect) = face_rect(&img, face, inset) {
                draw_hollow_rect_mut(&mut img, rect, color);
            }
        }
    }

    img
}

fn face_rect(img: &RgbImage, face: &FaceBox, inset: i32) -> Option<Rect> {
    let x1 = face.x1.max(0.0) as i32 + inset;
    let y1 = face.y1.max(0.0) as i32 + inset;
    let x2 = face.x2.min(img.width() as f32) as i32 - inset;
    let y2 = face.y2.min(img.height() as f32) as i32 - inset;

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(Rect::at(x1, y1).of_size((x2 - x1) as u32, (y2 - y1) as u32))
}
