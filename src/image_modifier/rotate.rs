use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Clockwise rotation. Quarter turns are lossless; any other angle grows the
/// canvas so no corner is cut off.
pub fn apply(img: &DynamicImage, degrees: f64) -> DynamicImage {
  match quarter_turns(degrees) {
    Some(0) => img.clone(),
    Some(1) => img.rotate90(),
    Some(2) => img.rotate180(),
    Some(_) => img.rotate270(),
    None => rotate_free(img, degrees),
  }
}

/// Size of the image after rotating a `width` x `height` image by `degrees`.
pub fn bounding_box(width: u32, height: u32, degrees: f64) -> (u64, u64) {
  let (w, h) = (u64::from(width), u64::from(height));

  match quarter_turns(degrees) {
    Some(1) | Some(3) => (h, w),
    Some(_) => (w, h),
    None => {
      let theta = normalize(degrees).to_radians();
      let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
      let (w, h) = (w as f64, h as f64);

      (
        (w * cos + h * sin).ceil() as u64,
        (w * sin + h * cos).ceil() as u64,
      )
    }
  }
}

fn normalize(degrees: f64) -> f64 {
  degrees.rem_euclid(360.0)
}

fn quarter_turns(degrees: f64) -> Option<u8> {
  let normalized = normalize(degrees);
  if normalized % 90.0 == 0.0 {
    // rem_euclid can round up to exactly 360
    Some((normalized / 90.0) as u8 % 4)
  } else {
    None
  }
}

fn rotate_free(img: &DynamicImage, degrees: f64) -> DynamicImage {
  let (width, height) = bounding_box(img.width(), img.height(), degrees);
  let (width, height) = (width as u32, height as u32);

  // The working canvas must hold the source before and after the turn
  let side = width.max(height).max(img.width()).max(img.height());
  let mut canvas = RgbaImage::from_pixel(side, side, TRANSPARENT);

  let x = (side - img.width()) / 2;
  let y = (side - img.height()) / 2;
  imageops::overlay(&mut canvas, &img.to_rgba8(), i64::from(x), i64::from(y));

  let theta = normalize(degrees).to_radians() as f32;
  let rotated = rotate_about_center(&canvas, theta, Interpolation::Bilinear, TRANSPARENT);

  let x = (side - width) / 2;
  let y = (side - height) / 2;
  DynamicImage::ImageRgba8(imageops::crop_imm(&rotated, x, y, width, height).to_image())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quarter_turns_swap_dimensions() {
    let img = DynamicImage::new_rgb8(40, 10);

    assert_eq!(apply(&img, 90.0).dimensions(), (10, 40));
    assert_eq!(apply(&img, -90.0).dimensions(), (10, 40));
    assert_eq!(apply(&img, 180.0).dimensions(), (40, 10));
    assert_eq!(apply(&img, 720.0).dimensions(), (40, 10));
  }

  #[test]
  fn positive_angle_turns_clockwise() {
    let mut src = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
    src.put_pixel(0, 0, Rgba([255, 255, 255, 255]));

    // the left pixel ends up on top after a clockwise quarter turn
    let out = apply(&DynamicImage::ImageRgba8(src), 90.0).to_rgba8();
    assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 255]);
    assert_eq!(out.get_pixel(0, 1).0, [0, 0, 0, 255]);
  }

  #[test]
  fn quarter_turn_detection() {
    assert_eq!(quarter_turns(0.0), Some(0));
    assert_eq!(quarter_turns(450.0), Some(1));
    assert_eq!(quarter_turns(-180.0), Some(2));
    assert_eq!(quarter_turns(-450.0), Some(3));
    assert_eq!(quarter_turns(45.0), None);
    assert_eq!(quarter_turns(90.5), None);
  }

  #[test]
  fn free_rotation_expands_canvas() {
    let (w, h) = bounding_box(100, 100, 45.0);
    assert_eq!((w, h), (142, 142));

    let out = apply(&DynamicImage::new_rgba8(100, 100), 45.0);
    assert_eq!(out.dimensions(), (142, 142));
  }

  #[test]
  fn free_rotation_leaves_corners_transparent() {
    let src = RgbaImage::from_pixel(50, 50, Rgba([10, 20, 30, 255]));
    let out = apply(&DynamicImage::ImageRgba8(src), 45.0).to_rgba8();

    assert_eq!(out.get_pixel(0, 0).0[3], 0);
    let (cx, cy) = (out.width() / 2, out.height() / 2);
    let centre = out.get_pixel(cx, cy).0;
    assert!(centre[3] >= 254);
    assert!((i16::from(centre[2]) - 30).abs() <= 1);
  }

  fn alpha_mass(img: &RgbaImage) -> u64 {
    img.pixels().map(|p| u64::from(p.0[3])).sum()
  }

  #[test]
  fn free_rotation_keeps_elongated_images_whole() {
    let src = RgbaImage::from_pixel(200, 20, Rgba([200, 100, 50, 255]));
    let expected = alpha_mass(&src) as f64;

    for degrees in [45.0, -30.0, 135.0, 10.0] {
      let out = apply(&DynamicImage::ImageRgba8(src.clone()), degrees).to_rgba8();
      let (w, h) = bounding_box(200, 20, degrees);
      assert_eq!((u64::from(out.width()), u64::from(out.height())), (w, h));

      let ratio = alpha_mass(&out) as f64 / expected;
      assert!((0.97..=1.03).contains(&ratio), "{degrees}: {ratio}");
    }
  }
}
