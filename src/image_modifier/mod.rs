use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageError, ImageFormat};
use thiserror::Error;

use crate::pipeline::ImageHandle;

pub mod greyscale;
pub mod resize;
pub mod rotate;

#[derive(Error, Debug)]
pub enum ModifierError {
  #[error("failed to decode image: {0}")]
  Decode(#[source] ImageError),
  #[error("failed to encode image: {0}")]
  Encode(#[source] ImageError),
  #[error("{operation} would produce a {width}x{height} image, the limit is {max} pixels per side")]
  TooLarge {
    operation: &'static str,
    width: u64,
    height: u64,
    max: u32,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
  Png,
  Jpeg,
}

impl OutputFormat {
  pub fn extension(self) -> &'static str {
    match self {
      OutputFormat::Png => "png",
      OutputFormat::Jpeg => "jpg",
    }
  }

  pub fn mime(self) -> &'static str {
    match self {
      OutputFormat::Png => "image/png",
      OutputFormat::Jpeg => "image/jpeg",
    }
  }
}

/// In-memory image that pipelines run against.
///
/// Every capability replaces the wrapped image; no operation may produce a
/// side longer than `max_dimension`.
pub struct Raster {
  image: DynamicImage,
  max_dimension: u32,
}

impl Raster {
  pub fn new(image: DynamicImage, max_dimension: u32) -> Raster {
    Raster {
      image,
      max_dimension,
    }
  }

  pub fn decode(data: &[u8], max_dimension: u32) -> Result<Raster, ModifierError> {
    let image = image::load_from_memory(data).map_err(ModifierError::Decode)?;
    Ok(Raster::new(image, max_dimension))
  }

  pub fn dimensions(&self) -> (u32, u32) {
    self.image.dimensions()
  }

  pub fn image(&self) -> &DynamicImage {
    &self.image
  }

  pub fn encode(&self, format: OutputFormat) -> Result<Vec<u8>, ModifierError> {
    let mut out = Cursor::new(Vec::new());

    match format {
      // JPEG has no alpha channel
      OutputFormat::Jpeg => DynamicImage::ImageRgb8(self.image.to_rgb8())
        .write_to(&mut out, ImageFormat::Jpeg)
        .map_err(ModifierError::Encode)?,
      OutputFormat::Png => self
        .image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(ModifierError::Encode)?,
    }

    Ok(out.into_inner())
  }

  fn check_bounds(&self, operation: &'static str, width: u64, height: u64) -> Result<(), ModifierError> {
    let max = u64::from(self.max_dimension);
    if width > max || height > max {
      return Err(ModifierError::TooLarge {
        operation,
        width,
        height,
        max: self.max_dimension,
      });
    }

    Ok(())
  }
}

impl ImageHandle for Raster {
  type Error = ModifierError;

  fn greyscale(&mut self) -> Result<&mut Self, ModifierError> {
    self.image = greyscale::apply(&self.image);
    Ok(self)
  }

  fn resize(&mut self, width: f64, height: f64) -> Result<&mut Self, ModifierError> {
    let (width, height) = (resize::to_pixels(width), resize::to_pixels(height));
    self.check_bounds("resize", width, height)?;

    // bounded by max_dimension above
    self.image = resize::apply(&self.image, width as u32, height as u32);
    Ok(self)
  }

  fn rotate(&mut self, degrees: f64) -> Result<&mut Self, ModifierError> {
    let (width, height) = rotate::bounding_box(self.image.width(), self.image.height(), degrees);
    self.check_bounds("rotate", width, height)?;

    self.image = rotate::apply(&self.image, degrees);
    Ok(self)
  }
}
