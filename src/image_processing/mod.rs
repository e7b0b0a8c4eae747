use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::image_modifier::{ModifierError, OutputFormat, Raster};
use crate::pipeline::{Pipeline, PipelineError};

pub const ACCEPTED_MIME: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

lazy_static! {
  static ref EXTENSION_REGEX: Regex = Regex::new(r"\.([A-Za-z0-9]{1,8})$").unwrap();
}

/// Multipart body of `POST /images/process`.
#[derive(ToSchema)]
pub struct ProcessImageForm {
  #[schema(value_type = String, format = Binary)]
  pub image: Vec<u8>,
  /// JSON array of steps, e.g. `[{"type":"RESIZE","width":200,"height":200}]`
  pub options: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateImageRequest {
  /// Array of steps, or a string holding the JSON array
  #[schema(value_type = Object)]
  pub options: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
  pub id: i64,
  pub original_url: String,
  pub processed_url: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum RenderError {
  #[error("{0}")]
  Decode(#[source] ModifierError),
  #[error(transparent)]
  Pipeline(#[from] PipelineError),
  #[error("{0}")]
  Encode(#[source] ModifierError),
}

/// Decodes `source`, runs `pipeline` on it and encodes the result.
///
/// CPU bound; meant to run on the worker pool.
pub fn render(
  source: &[u8],
  pipeline: &Pipeline,
  format: OutputFormat,
  max_dimension: u32,
) -> Result<Vec<u8>, RenderError> {
  let mut raster = Raster::decode(source, max_dimension).map_err(RenderError::Decode)?;
  pipeline.execute(&mut raster)?;
  raster.encode(format).map_err(RenderError::Encode)
}

pub fn is_accepted_mime(mime: &str) -> bool {
  ACCEPTED_MIME.contains(&mime)
}

/// JPEG uploads stay JPEG, everything else is written as PNG.
pub fn output_format_for_mime(mime: &str) -> OutputFormat {
  if mime.contains("jpeg") || mime.contains("jpg") {
    OutputFormat::Jpeg
  } else {
    OutputFormat::Png
  }
}

/// Extension for the stored original, taken from the client file name.
pub fn original_extension(file_name: Option<&str>) -> String {
  file_name
    .and_then(|name| EXTENSION_REGEX.captures(name))
    .map(|c| c[1].to_ascii_lowercase())
    .unwrap_or_else(|| "jpg".to_owned())
}
