//! Image transformation pipelines.
//!
//! A pipeline is compiled once from an untrusted options payload (a JSON
//! array of step objects, or a string holding one) into a list of typed
//! [`Operation`]s, and only then executed against an [`ImageHandle`].
//! Compilation never touches the image, so an invalid payload applies
//! nothing.
//!
//! ```
//! use img_processing_api::pipeline::{Operation, Pipeline};
//!
//! let pipeline = Pipeline::compile(r#"[{"type":"resize","width":64,"height":48}]"#).unwrap();
//! assert_eq!(
//!   pipeline.operations(),
//!   &[Operation::Resize { width: 64.0, height: 48.0 }]
//! );
//! ```

use serde_json::Value;

mod compile;
mod error;
mod execute;

pub use error::PipelineError;
pub use execute::process;

/// Options payload as received from a request, before any validation.
#[derive(Debug, Clone)]
pub enum RawOptions {
  Text(String),
  Structured(Value),
}

impl From<String> for RawOptions {
  fn from(text: String) -> Self {
    RawOptions::Text(text)
  }
}

impl From<&str> for RawOptions {
  fn from(text: &str) -> Self {
    RawOptions::Text(text.to_owned())
  }
}

impl From<Value> for RawOptions {
  fn from(value: Value) -> Self {
    match value {
      Value::String(text) => RawOptions::Text(text),
      other => RawOptions::Structured(other),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
  Greyscale,
  Resize { width: f64, height: f64 },
  Rotate { degrees: f64 },
}

/// Validated, ordered list of operations. Order is significant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
  operations: Vec<Operation>,
}

impl Pipeline {
  pub fn operations(&self) -> &[Operation] {
    &self.operations
  }

  pub fn len(&self) -> usize {
    self.operations.len()
  }

  pub fn is_empty(&self) -> bool {
    self.operations.is_empty()
  }
}

/// The three mutations a pipeline may perform on an image.
///
/// Each capability mutates the handle in place and hands it back so calls
/// can be chained.
pub trait ImageHandle {
  type Error: std::error::Error + Send + Sync + 'static;

  fn greyscale(&mut self) -> Result<&mut Self, Self::Error>;

  fn resize(&mut self, width: f64, height: f64) -> Result<&mut Self, Self::Error>;

  fn rotate(&mut self, degrees: f64) -> Result<&mut Self, Self::Error>;
}
