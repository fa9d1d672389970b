pub mod annotate;

pub use annotate::draw_detections;
