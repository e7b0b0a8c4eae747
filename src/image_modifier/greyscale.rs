use image::DynamicImage;

/// Luminance conversion. Alpha survives as a LumaA image.
pub fn apply(img: &DynamicImage) -> DynamicImage {
  img.grayscale()
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{GenericImageView, Rgba, RgbaImage};

  #[test]
  fn keeps_dimensions_and_alpha() {
    let src = RgbaImage::from_pixel(3, 2, Rgba([255, 0, 0, 128]));
    let out = apply(&DynamicImage::ImageRgba8(src));

    assert_eq!(out.dimensions(), (3, 2));
    assert!(out.color().has_alpha());

    let px = out.to_rgba8().get_pixel(0, 0).0;
    assert_eq!(px[0], px[2]);
    assert_eq!(px[3], 128);
  }
}
