use image::{imageops::FilterType, DynamicImage};

/// Rounds a requested dimension to whole pixels, never below one.
pub fn to_pixels(value: f64) -> u64 {
  value.round().max(1.0) as u64
}

pub fn apply(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
  img.resize_exact(width, height, FilterType::Triangle)
}
